//! Domain types for sylva-io.

use sylva_forest::{ColumnKind, Dataset, TableSchema, Value};

use crate::IoError;

/// A validated experiment name for output file naming.
///
/// Must match `[a-zA-Z0-9_-]+`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentName(String);

impl ExperimentName {
    /// Parse and validate an experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidExperimentName`] if the name is empty or
    /// contains characters outside `[a-zA-Z0-9_-]`.
    pub fn new(name: String) -> Result<Self, IoError> {
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(IoError::InvalidExperimentName { name });
        }
        Ok(Self(name))
    }

    /// Return the experiment name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ExperimentName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which CSV column holds the label.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LabelColumn {
    /// The right-most column.
    #[default]
    Last,
    /// The column with this header name.
    Named(String),
    /// No label column; every column is a feature.
    None,
}

/// A typed table read from CSV.
///
/// Produced by [`TableReader`](crate::TableReader). Feature rows and labels
/// are stored in parallel vectors: `labels[i]` belongs to `features[i]`.
#[derive(Debug, Clone)]
pub struct Table {
    pub(crate) feature_names: Vec<String>,
    pub(crate) feature_kinds: Vec<ColumnKind>,
    pub(crate) features: Vec<Vec<Value>>,
    pub(crate) label_name: Option<String>,
    pub(crate) label_kind: Option<ColumnKind>,
    pub(crate) labels: Option<Vec<Value>>,
}

impl Table {
    /// Return the feature column names in file order.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Return the resolved type of each feature column.
    #[must_use]
    pub fn feature_kinds(&self) -> &[ColumnKind] {
        &self.feature_kinds
    }

    /// Return the feature rows.
    #[must_use]
    pub fn features(&self) -> &[Vec<Value>] {
        &self.features
    }

    /// Return the label column name, if the table has one.
    #[must_use]
    pub fn label_name(&self) -> Option<&str> {
        self.label_name.as_deref()
    }

    /// Return the labels, if the table has a label column.
    #[must_use]
    pub fn labels(&self) -> Option<&[Value]> {
        self.labels.as_deref()
    }

    /// Return the number of data rows.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.features.len()
    }

    /// Return the number of feature columns.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Return the resolved type of the label column, if the table has one.
    #[must_use]
    pub fn label_kind(&self) -> Option<ColumnKind> {
        self.label_kind
    }

    /// Build the schema that fixes this table's column names and kinds.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Dataset`] when two feature columns share a name.
    pub fn schema(&self) -> Result<TableSchema, IoError> {
        let schema = TableSchema::new(self.feature_names.clone(), self.feature_kinds.clone())?;
        Ok(match self.label_kind {
            Some(kind) => schema.with_label_kind(kind),
            None => schema,
        })
    }

    /// Convert into a training [`Dataset`] carrying this table's schema.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::MissingLabels`] | The table was read without a label column |
    /// | [`IoError::Dataset`] | The core rejects the rows or the schema |
    pub fn into_dataset(self) -> Result<Dataset, IoError> {
        let schema = self.schema()?;
        let labels = self.labels.ok_or(IoError::MissingLabels)?;
        Ok(Dataset::from_xy(self.features, labels)?.with_schema(schema)?)
    }
}
