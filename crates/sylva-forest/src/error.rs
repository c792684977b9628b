use std::path::PathBuf;

use crate::schema::ColumnKind;
use crate::value::Value;

/// Coarse classification of a [`ForestError`].
///
/// Callers that only care about *why* an operation was refused (bad data,
/// bad parameters, an unanswerable prediction, or a model file problem) can
/// match on this instead of the individual variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The data handed to `fit` or `predict` is malformed.
    InvalidInput,
    /// A hyperparameter is outside its documented range.
    Configuration,
    /// Prediction reached a leaf that carries no label.
    NoMajorityLabel,
    /// Reading or writing a persisted model failed.
    Persistence,
}

/// Errors from dataset construction, training, prediction and persistence.
#[derive(Debug, thiserror::Error)]
pub enum ForestError {
    /// Returned when n_trees is zero.
    #[error("n_trees must be at least 1, got {n_trees}")]
    InvalidTreeCount {
        /// The invalid n_trees value provided.
        n_trees: usize,
    },

    /// Returned when bootstrap_fraction is not in (0.0, 1.0].
    #[error("bootstrap_fraction must be in (0.0, 1.0], got {fraction}")]
    InvalidBootstrapFraction {
        /// The invalid bootstrap_fraction value provided.
        fraction: f64,
    },

    /// Returned when `floor(bootstrap_fraction * n_samples)` is zero.
    #[error("bootstrap_fraction {fraction} of {n_samples} samples draws no rows")]
    EmptyBootstrapSample {
        /// Number of training samples.
        n_samples: usize,
        /// The configured bootstrap fraction.
        fraction: f64,
    },

    /// Returned when n_folds is less than 2.
    #[error("n_folds must be at least 2, got {n_folds}")]
    InvalidFoldCount {
        /// The invalid n_folds value provided.
        n_folds: usize,
    },

    /// Returned when the training dataset has zero samples.
    #[error("training dataset has zero samples")]
    EmptyDataset,

    /// Returned when a row has no columns at all (not even a label).
    #[error("row {row_index} has no columns")]
    EmptyRow {
        /// The zero-based index of the offending row.
        row_index: usize,
    },

    /// Returned when rows carry a label but no feature columns.
    #[error("training dataset has zero feature columns")]
    ZeroFeatures,

    /// Returned when a sample has a different number of features than expected.
    #[error("sample {sample_index} has {got} features, expected {expected}")]
    FeatureCountMismatch {
        /// The expected number of features.
        expected: usize,
        /// The actual number of features in the sample.
        got: usize,
        /// The zero-based index of the offending sample.
        sample_index: usize,
    },

    /// Returned when the feature table and label sequence differ in length.
    #[error("{n_samples} feature rows but {n_labels} labels")]
    LabelCountMismatch {
        /// Number of feature rows.
        n_samples: usize,
        /// Number of labels.
        n_labels: usize,
    },

    /// Returned when a sample has a different number of features at prediction time.
    #[error("prediction input has {got} features, expected {expected}")]
    PredictionFeatureMismatch {
        /// The expected number of features.
        expected: usize,
        /// The actual number of features in the prediction input.
        got: usize,
    },

    /// Returned when a numeric feature value is NaN or infinite.
    #[error("non-finite value at sample {sample_index}, feature {feature_index}")]
    NonFiniteValue {
        /// The zero-based index of the offending sample.
        sample_index: usize,
        /// The zero-based index of the offending feature column.
        feature_index: usize,
    },

    /// Returned when a numeric label is NaN or infinite.
    #[error("non-finite label at sample {sample_index}")]
    NonFiniteLabel {
        /// The zero-based index of the offending sample.
        sample_index: usize,
    },

    /// Returned when a schema's name and kind lists differ in length.
    #[error("schema has {n_names} feature names but {n_kinds} kinds")]
    SchemaLengthMismatch {
        /// Number of feature names.
        n_names: usize,
        /// Number of column kinds.
        n_kinds: usize,
    },

    /// Returned when a schema names the same feature twice.
    #[error("feature name {name:?} appears more than once")]
    DuplicateFeatureName {
        /// The repeated name.
        name: String,
    },

    /// Returned when a schema does not cover every feature column.
    #[error("schema describes {got} features, dataset has {expected}")]
    SchemaWidthMismatch {
        /// Feature columns in the dataset.
        expected: usize,
        /// Feature columns in the schema.
        got: usize,
    },

    /// Returned when a row value does not have its column's declared kind.
    #[error("sample {sample_index}, feature {feature_index}: expected a {expected} value")]
    SchemaTypeMismatch {
        /// The zero-based index of the offending sample.
        sample_index: usize,
        /// The zero-based index of the offending feature column.
        feature_index: usize,
        /// The kind the schema declares.
        expected: ColumnKind,
    },

    /// Returned when prediction ends in a leaf built from zero samples.
    #[error("reached a leaf with no training samples; no majority label exists")]
    NoMajorityLabel,

    /// Returned when a label has fewer samples than the number of folds.
    #[error("label {label} has only {count} samples, need at least {n_folds} for stratified CV")]
    TooFewSamplesForFolds {
        /// The label with insufficient samples.
        label: Value,
        /// The number of samples carrying that label.
        count: usize,
        /// The requested number of folds.
        n_folds: usize,
    },

    /// Returned when OOB evaluation fails (no sample has any OOB tree).
    #[error("OOB evaluation failed: {reason}")]
    OobEvaluationFailed {
        /// Human-readable description of why OOB evaluation failed.
        reason: String,
    },

    /// Returned when model serialization fails.
    #[error("failed to serialize model")]
    SerializeModel {
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when model deserialization fails.
    #[error("failed to deserialize model from {path}")]
    DeserializeModel {
        /// Path to the model file that could not be deserialized.
        path: PathBuf,
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when writing the model file fails.
    #[error("failed to write model to {path}")]
    WriteModel {
        /// Path to the file that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when reading the model file fails.
    #[error("failed to read model from {path}")]
    ReadModel {
        /// Path to the file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when loading a model with an incompatible format version.
    #[error("incompatible model version in {path}: expected {expected}, found {found}")]
    IncompatibleModelVersion {
        /// The model format version this build expects.
        expected: u32,
        /// The model format version found in the file.
        found: u32,
        /// Path to the model file with the incompatible version.
        path: PathBuf,
    },
}

impl ForestError {
    /// Return the coarse category of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            ForestError::InvalidTreeCount { .. }
            | ForestError::InvalidBootstrapFraction { .. }
            | ForestError::EmptyBootstrapSample { .. }
            | ForestError::InvalidFoldCount { .. } => ErrorKind::Configuration,
            ForestError::EmptyDataset
            | ForestError::EmptyRow { .. }
            | ForestError::ZeroFeatures
            | ForestError::FeatureCountMismatch { .. }
            | ForestError::LabelCountMismatch { .. }
            | ForestError::PredictionFeatureMismatch { .. }
            | ForestError::NonFiniteValue { .. }
            | ForestError::NonFiniteLabel { .. }
            | ForestError::SchemaLengthMismatch { .. }
            | ForestError::DuplicateFeatureName { .. }
            | ForestError::SchemaWidthMismatch { .. }
            | ForestError::SchemaTypeMismatch { .. }
            | ForestError::TooFewSamplesForFolds { .. }
            | ForestError::OobEvaluationFailed { .. } => ErrorKind::InvalidInput,
            ForestError::NoMajorityLabel => ErrorKind::NoMajorityLabel,
            ForestError::SerializeModel { .. }
            | ForestError::DeserializeModel { .. }
            | ForestError::WriteModel { .. }
            | ForestError::ReadModel { .. }
            | ForestError::IncompatibleModelVersion { .. } => ErrorKind::Persistence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ErrorKind, ForestError};

    #[test]
    fn configuration_kinds() {
        assert_eq!(
            ForestError::InvalidTreeCount { n_trees: 0 }.kind(),
            ErrorKind::Configuration
        );
        assert_eq!(
            ForestError::InvalidBootstrapFraction { fraction: 1.5 }.kind(),
            ErrorKind::Configuration
        );
    }

    #[test]
    fn input_kinds() {
        assert_eq!(
            ForestError::LabelCountMismatch { n_samples: 3, n_labels: 2 }.kind(),
            ErrorKind::InvalidInput
        );
        assert_eq!(ForestError::ZeroFeatures.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn no_majority_label_kind() {
        assert_eq!(ForestError::NoMajorityLabel.kind(), ErrorKind::NoMajorityLabel);
    }

    #[test]
    fn display_includes_fields() {
        let err = ForestError::FeatureCountMismatch {
            expected: 3,
            got: 2,
            sample_index: 7,
        };
        assert_eq!(err.to_string(), "sample 7 has 2 features, expected 3");
    }
}
