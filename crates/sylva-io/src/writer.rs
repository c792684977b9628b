//! CSV and JSON writers for training, prediction and evaluation outputs.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use sylva_forest::{CrossValidationResult, ForestPrediction, RandomForestResult, Value};
use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::ExperimentName;

/// Writes experiment artifacts into one output directory.
///
/// Creates the output directory on construction if it does not exist.
/// Output files are named `{experiment}_predictions.csv`,
/// `{experiment}_training.json` and `{experiment}_evaluation.json`.
pub struct ResultWriter {
    output_dir: PathBuf,
    experiment: ExperimentName,
}

impl ResultWriter {
    /// Create a new writer targeting the given directory and experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::OutputDirCreate`] if the directory cannot be created.
    #[instrument(skip_all, fields(dir = %output_dir.display(), experiment = %experiment))]
    pub fn new(output_dir: &Path, experiment: ExperimentName) -> Result<Self, IoError> {
        fs::create_dir_all(output_dir).map_err(|e| IoError::OutputDirCreate {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
        debug!("output directory ready");
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            experiment,
        })
    }

    /// Write per-row predictions to `{experiment}_predictions.csv`.
    ///
    /// Columns are `row,prediction,confidence`, one line per input row in order.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteFile`] or [`IoError::WriteCsv`] if the file
    /// cannot be written.
    #[instrument(skip_all, fields(n_rows = prediction.len()))]
    pub fn write_predictions(&self, prediction: &ForestPrediction) -> Result<PathBuf, IoError> {
        let path = self.artifact_path("predictions.csv");
        let csv_error = |e| IoError::WriteCsv {
            path: path.clone(),
            source: e,
        };

        let file = fs::File::create(&path).map_err(|e| IoError::WriteFile {
            path: path.clone(),
            source: e,
        })?;
        let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        wtr.write_record(["row", "prediction", "confidence"]).map_err(csv_error)?;
        for (row, (label, confidence)) in
            prediction.labels.iter().zip(&prediction.confidences).enumerate()
        {
            wtr.serialize(PredictionRecord {
                row,
                prediction: label.to_string(),
                confidence: *confidence,
            })
            .map_err(csv_error)?;
        }
        wtr.flush().map_err(|e| IoError::WriteFile {
            path: path.clone(),
            source: e,
        })?;

        info!(path = %path.display(), "predictions written");
        Ok(path)
    }

    /// Write a training summary to `{experiment}_training.json` and return it.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteFile`] if the file cannot be written.
    #[instrument(skip_all)]
    pub fn write_training(
        &self,
        feature_names: &[String],
        max_depth: Option<usize>,
        bootstrap_fraction: f64,
        seed: u64,
        result: &RandomForestResult,
    ) -> Result<String, IoError> {
        let metadata = result.metadata();
        let artifact = TrainingArtifact {
            experiment: self.experiment.as_str(),
            model_path: self.model_path(),
            n_trees: metadata.n_trees,
            max_depth,
            bootstrap_fraction,
            seed,
            n_samples: metadata.n_samples,
            n_features: metadata.n_features,
            n_labels: metadata.n_labels,
            draw_count: metadata.draw_count,
            feature_names,
            oob_accuracy: result.oob_score().map(|s| s.accuracy),
            oob_samples: result.oob_score().map(|s| s.n_oob_samples),
        };
        let json = serde_json::to_string_pretty(&artifact)?;
        self.write_json("training.json", &json)?;
        Ok(json)
    }

    /// Write cross-validation results to `{experiment}_evaluation.json`.
    ///
    /// Each `(model, result)` pair becomes one entry under `models`, keeping
    /// the given order.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteFile`] if the file cannot be written.
    #[instrument(skip_all, fields(n_models = models.len()))]
    pub fn write_evaluation(
        &self,
        models: &[(&str, &CrossValidationResult)],
    ) -> Result<String, IoError> {
        let entries: Vec<ModelEntry> = models
            .iter()
            .map(|&(model, result)| ModelEntry::new(model, result))
            .collect();
        let artifact = EvaluationArtifact {
            experiment: self.experiment.as_str(),
            n_samples: models.first().map_or(0, |(_, r)| r.n_samples),
            n_features: models.first().map_or(0, |(_, r)| r.n_features),
            models: entries,
        };
        let json = serde_json::to_string_pretty(&artifact)?;
        self.write_json("evaluation.json", &json)?;
        Ok(json)
    }

    /// Return the path where the model binary should be saved.
    ///
    /// Does not write anything, just computes `{output_dir}/{experiment}_model.bin`.
    #[must_use]
    pub fn model_path(&self) -> PathBuf {
        self.artifact_path("model.bin")
    }

    fn artifact_path(&self, suffix: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}_{suffix}", self.experiment.as_str()))
    }

    fn write_json(&self, suffix: &str, json: &str) -> Result<(), IoError> {
        let path = self.artifact_path(suffix);
        fs::write(&path, json).map_err(|e| IoError::WriteFile {
            path: path.clone(),
            source: e,
        })?;
        info!(path = %path.display(), "artifact written");
        Ok(())
    }
}

fn label_text(label: &Value) -> String {
    label.to_string()
}

// --- Shadow structs for serialization ---

#[derive(Serialize)]
struct PredictionRecord {
    row: usize,
    prediction: String,
    confidence: f64,
}

#[derive(Serialize)]
struct TrainingArtifact<'a> {
    experiment: &'a str,
    model_path: PathBuf,
    n_trees: usize,
    max_depth: Option<usize>,
    bootstrap_fraction: f64,
    seed: u64,
    n_samples: usize,
    n_features: usize,
    n_labels: usize,
    draw_count: usize,
    feature_names: &'a [String],
    oob_accuracy: Option<f64>,
    oob_samples: Option<usize>,
}

#[derive(Serialize)]
struct EvaluationArtifact<'a> {
    experiment: &'a str,
    n_samples: usize,
    n_features: usize,
    models: Vec<ModelEntry<'a>>,
}

#[derive(Serialize)]
struct ModelEntry<'a> {
    model: &'a str,
    n_folds: usize,
    cv_accuracy_mean: f64,
    cv_accuracy_std: f64,
    fold_accuracies: &'a [f64],
    labels: Vec<String>,
    confusion_matrix: &'a [Vec<usize>],
    class_metrics: Vec<ClassEntry>,
}

impl<'a> ModelEntry<'a> {
    fn new(model: &'a str, result: &'a CrossValidationResult) -> Self {
        let cm = &result.confusion_matrix;
        Self {
            model,
            n_folds: result.n_folds,
            cv_accuracy_mean: result.mean_accuracy,
            cv_accuracy_std: result.std_accuracy,
            fold_accuracies: &result.fold_accuracies,
            labels: cm.labels().iter().map(label_text).collect(),
            confusion_matrix: cm.as_rows(),
            class_metrics: cm
                .class_metrics()
                .into_iter()
                .map(|m| ClassEntry {
                    label: label_text(&m.label),
                    precision: m.precision,
                    recall: m.recall,
                    f1: m.f1,
                    support: m.support,
                })
                .collect(),
        }
    }
}

#[derive(Serialize)]
struct ClassEntry {
    label: String,
    precision: f64,
    recall: f64,
    f1: f64,
    support: usize,
}
