use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};

use sylva_forest::{
    CrossValidation, DecisionTreeConfig, OobMode, RandomForest, RandomForestConfig, accuracy,
};
use sylva_io::{ExperimentName, LabelColumn, ResultWriter, Table, TableReader};

#[derive(Parser)]
#[command(name = "sylva")]
#[command(about = "Decision trees and bagged random forests for mixed numeric/categorical tables")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// RNG seed for reproducibility
    #[arg(long, default_value_t = 42, global = true)]
    seed: u64,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for parallel prediction (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

/// Shared forest parameters.
#[derive(Args, Debug, Clone)]
struct ForestArgs {
    /// Number of trees in the forest
    #[arg(long, default_value_t = 100)]
    n_trees: usize,

    /// Maximum tree depth (unlimited if not set)
    #[arg(long)]
    max_depth: Option<usize>,

    /// Fraction of the rows drawn (with replacement) for each tree
    #[arg(long, default_value_t = 1.0)]
    ratio: f64,
}

impl ForestArgs {
    fn config(&self, seed: u64) -> Result<RandomForestConfig> {
        Ok(RandomForestConfig::new(self.n_trees)?
            .with_max_depth(self.max_depth)
            .with_bootstrap_fraction(self.ratio)
            .with_seed(seed))
    }
}

#[derive(Subcommand)]
enum Command {
    /// Train a random forest and save it
    Train {
        /// Path to the input CSV file
        #[arg(long)]
        data: PathBuf,

        /// Header of the label column (defaults to the last column)
        #[arg(long)]
        label_column: Option<String>,

        /// Experiment name for output files (must match [a-zA-Z0-9_-]+)
        #[arg(long)]
        experiment: String,

        /// Output directory for result files
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,

        /// Score the forest on out-of-bag rows
        #[arg(long, default_value_t = false)]
        oob: bool,

        #[command(flatten)]
        forest: ForestArgs,
    },

    /// Predict labels for new rows with a saved forest
    Predict {
        /// Path to the trained model binary
        #[arg(long)]
        model: PathBuf,

        /// Path to the input CSV file
        #[arg(long)]
        data: PathBuf,

        /// Header of a label column to hold out and score against
        #[arg(long)]
        label_column: Option<String>,

        /// Experiment name for output files
        #[arg(long)]
        experiment: String,

        /// Output directory for result files
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,
    },

    /// Cross-validate a single tree and a forest side by side
    Evaluate {
        /// Path to the input CSV file
        #[arg(long)]
        data: PathBuf,

        /// Header of the label column (defaults to the last column)
        #[arg(long)]
        label_column: Option<String>,

        /// Experiment name for output files
        #[arg(long)]
        experiment: String,

        /// Output directory for result files
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,

        /// Number of cross-validation folds
        #[arg(long, default_value_t = 5)]
        folds: usize,

        #[command(flatten)]
        forest: ForestArgs,
    },

    /// Fit one decision tree and print it
    Inspect {
        /// Path to the input CSV file
        #[arg(long)]
        data: PathBuf,

        /// Header of the label column (defaults to the last column)
        #[arg(long)]
        label_column: Option<String>,

        /// Maximum tree depth (unlimited if not set)
        #[arg(long)]
        max_depth: Option<usize>,
    },
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
struct TrainOutput {
    experiment: String,
    n_samples: usize,
    n_features: usize,
    n_labels: usize,
    n_trees: usize,
    draw_count: usize,
    oob_accuracy: Option<f64>,
    model_path: PathBuf,
}

#[derive(Serialize)]
struct PredictOutput {
    experiment: String,
    n_rows: usize,
    model_n_trees: usize,
    model_n_features: usize,
    mean_confidence: f64,
    accuracy: Option<f64>,
    predictions_path: PathBuf,
}

#[derive(Serialize)]
struct EvaluateOutput {
    experiment: String,
    n_samples: usize,
    n_folds: usize,
    tree_mean_accuracy: f64,
    tree_std_accuracy: f64,
    forest_mean_accuracy: f64,
    forest_std_accuracy: f64,
    n_trees: usize,
}

fn label_column(name: Option<String>) -> LabelColumn {
    name.map_or(LabelColumn::Last, LabelColumn::Named)
}

fn read_table(path: &Path, label: LabelColumn) -> Result<Table> {
    TableReader::new(path)
        .with_label(label)
        .read()
        .with_context(|| format!("failed to read {}", path.display()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    match cli.command {
        Command::Train {
            data,
            label_column: label,
            experiment,
            output_dir,
            oob,
            forest,
        } => {
            let experiment_name = ExperimentName::new(experiment.clone())?;

            // 1. Read the table
            let table = read_table(&data, label_column(label))?;
            let feature_names = table.feature_names().to_vec();
            let dataset = table.into_dataset().context("failed to build dataset")?;

            // 2. Train
            let oob_mode = if oob { OobMode::Enabled } else { OobMode::Disabled };
            let config = forest.config(cli.seed)?.with_oob_mode(oob_mode);
            let result = config.fit(&dataset).context("training failed")?;
            let oob_accuracy = result.oob_score().map(|s| s.accuracy);
            info!(oob_accuracy = ?oob_accuracy, "forest trained");

            // 3. Save model and training summary
            let writer = ResultWriter::new(&output_dir, experiment_name)?;
            result
                .forest()
                .save(writer.model_path())
                .context("failed to save model")?;
            info!(path = %writer.model_path().display(), "model saved");
            writer.write_training(
                &feature_names,
                forest.max_depth,
                forest.ratio,
                cli.seed,
                &result,
            )?;

            let metadata = result.metadata();
            let output = TrainOutput {
                experiment,
                n_samples: metadata.n_samples,
                n_features: metadata.n_features,
                n_labels: metadata.n_labels,
                n_trees: metadata.n_trees,
                draw_count: metadata.draw_count,
                oob_accuracy,
                model_path: writer.model_path(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Predict {
            model,
            data,
            label_column: label,
            experiment,
            output_dir,
        } => {
            let experiment_name = ExperimentName::new(experiment.clone())?;

            // 1. Load model
            let forest = RandomForest::load(&model).context("failed to load model")?;
            info!(
                n_trees = forest.n_trees(),
                n_features = forest.n_features(),
                "model loaded"
            );

            // 2. Read rows by the training column names and kinds, holding out
            //    the label column when one is named
            let mut reader = TableReader::new(&data)
                .with_label(label.map_or(LabelColumn::None, LabelColumn::Named));
            match forest.schema() {
                Some(schema) => reader = reader.with_schema(schema.clone()),
                None => warn!("model carries no schema; columns are matched by position"),
            }
            let table = reader
                .read()
                .with_context(|| format!("failed to read {}", data.display()))?;

            // 3. Predict
            let prediction = forest
                .predict_with_confidence(table.features())
                .context("prediction failed")?;
            let accuracy = table.labels().map(|truth| accuracy(truth, &prediction.labels));
            if let Some(accuracy) = accuracy {
                info!(accuracy, "scored against held-out labels");
            }

            // 4. Write predictions CSV
            let writer = ResultWriter::new(&output_dir, experiment_name)?;
            let predictions_path = writer.write_predictions(&prediction)?;

            let mean_confidence = if prediction.is_empty() {
                0.0
            } else {
                prediction.confidences.iter().sum::<f64>() / prediction.len() as f64
            };
            let output = PredictOutput {
                experiment,
                n_rows: prediction.len(),
                model_n_trees: forest.n_trees(),
                model_n_features: forest.n_features(),
                mean_confidence,
                accuracy,
                predictions_path,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Evaluate {
            data,
            label_column: label,
            experiment,
            output_dir,
            folds,
            forest,
        } => {
            let experiment_name = ExperimentName::new(experiment.clone())?;

            let dataset = read_table(&data, label_column(label))?
                .into_dataset()
                .context("failed to build dataset")?;

            let cv = CrossValidation::new(folds)?.with_seed(cli.seed);
            let tree_config = DecisionTreeConfig::new().with_max_depth(forest.max_depth);
            let tree_result = cv
                .evaluate(&tree_config, &dataset)
                .context("decision tree cross-validation failed")?;
            info!(
                mean_accuracy = tree_result.mean_accuracy,
                std_accuracy = tree_result.std_accuracy,
                "decision tree cross-validation complete"
            );

            let forest_result = cv
                .evaluate(&forest.config(cli.seed)?, &dataset)
                .context("random forest cross-validation failed")?;
            info!(
                mean_accuracy = forest_result.mean_accuracy,
                std_accuracy = forest_result.std_accuracy,
                "random forest cross-validation complete"
            );

            let writer = ResultWriter::new(&output_dir, experiment_name)?;
            writer.write_evaluation(&[
                ("decision_tree", &tree_result),
                ("random_forest", &forest_result),
            ])?;

            let output = EvaluateOutput {
                experiment,
                n_samples: dataset.n_samples(),
                n_folds: folds,
                tree_mean_accuracy: tree_result.mean_accuracy,
                tree_std_accuracy: tree_result.std_accuracy,
                forest_mean_accuracy: forest_result.mean_accuracy,
                forest_std_accuracy: forest_result.std_accuracy,
                n_trees: forest.n_trees,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Inspect {
            data,
            label_column: label,
            max_depth,
        } => {
            let table = read_table(&data, label_column(label))?;
            let names = table.feature_names().to_vec();
            let dataset = table.into_dataset().context("failed to build dataset")?;
            let tree = DecisionTreeConfig::new()
                .with_max_depth(max_depth)
                .fit(&dataset);
            info!(
                depth = tree.depth(),
                n_leaves = tree.n_leaves(),
                "tree fitted"
            );

            for (index, name) in names.iter().enumerate() {
                println!("x[{index}] = {name}");
            }
            print!("{tree}");
        }
    }

    Ok(())
}
