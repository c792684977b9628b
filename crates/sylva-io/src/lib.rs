//! CSV ingestion and result writers for the sylva pipeline.

mod domain;
mod error;
mod reader;
mod writer;

pub use domain::{ExperimentName, LabelColumn, Table};
pub use sylva_forest::{ColumnKind, TableSchema};
pub use error::IoError;
pub use reader::TableReader;
pub use writer::ResultWriter;
