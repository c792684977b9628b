//! I/O error types for sylva-io.

use std::path::PathBuf;

use sylva_forest::{ColumnKind, ForestError};

/// Errors from CSV ingestion, result writing, and dataset hand-off.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// Returned when the input file does not exist or is unreadable.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when the CSV parser encounters a malformed record.
    #[error("CSV parse error in {path} at byte offset {offset}")]
    CsvParse {
        /// Path to the CSV file.
        path: PathBuf,
        /// Byte offset where the error occurred.
        offset: u64,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// Returned when the CSV file contains a header but zero data rows.
    #[error("empty dataset (no data rows) in {path}")]
    EmptyDataset {
        /// Path to the CSV file.
        path: PathBuf,
    },

    /// Returned when no column is left over for features.
    #[error("no feature columns in {path}")]
    NoFeatureColumns {
        /// Path to the CSV file.
        path: PathBuf,
    },

    /// Returned when a data row has a different number of columns than the header.
    #[error("inconsistent row length in {path}: row {row_index} has {got} columns, expected {expected}")]
    InconsistentRowLength {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// Expected number of columns (from header).
        expected: usize,
        /// Actual number of columns in this row.
        got: usize,
    },

    /// Returned when a cell is empty.
    #[error("missing value in {path}: row {row_index}, column \"{column}\"")]
    MissingValue {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// Header name of the column.
        column: String,
    },

    /// Returned when the requested label column is not in the header.
    #[error("label column \"{column}\" not found in {path}")]
    UnknownLabelColumn {
        /// Path to the CSV file.
        path: PathBuf,
        /// The requested column name.
        column: String,
    },

    /// Returned when a column named by the model schema is not in the header.
    #[error("feature column \"{column}\" not found in {path}")]
    MissingFeatureColumn {
        /// Path to the CSV file.
        path: PathBuf,
        /// The column the model was trained on.
        column: String,
    },

    /// Returned when a cell cannot be read as its column's schema kind.
    #[error("row {row_index}, column \"{column}\" in {path}: {cell:?} is not a {expected} value")]
    CellTypeMismatch {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// Header name of the column.
        column: String,
        /// The offending cell text.
        cell: String,
        /// The kind the schema declares for this column.
        expected: ColumnKind,
    },

    /// Returned when a table read without labels is used for training.
    #[error("table has no label column")]
    MissingLabels,

    /// Returned when the experiment name contains characters outside `[a-zA-Z0-9_-]`.
    #[error("invalid experiment name \"{name}\": must match [a-zA-Z0-9_-]+")]
    InvalidExperimentName {
        /// The invalid name.
        name: String,
    },

    /// Returned when the output directory cannot be created.
    #[error("cannot create output directory {path}")]
    OutputDirCreate {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when a result file cannot be written.
    #[error("cannot write file {path}")]
    WriteFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when a CSV result record cannot be written.
    #[error("cannot write CSV record to {path}")]
    WriteCsv {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// Returned when a JSON artifact cannot be encoded.
    #[error("cannot encode JSON artifact")]
    SerializeJson {
        /// Underlying serde_json error.
        #[from]
        source: serde_json::Error,
    },

    /// Returned when the parsed table is rejected by the model core.
    #[error("invalid dataset")]
    Dataset(#[from] ForestError),
}
