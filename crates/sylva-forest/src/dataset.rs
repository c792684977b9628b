//! Validated in-memory training tables.

use crate::error::ForestError;
use crate::node::FeatureIndex;
use crate::schema::TableSchema;
use crate::value::Value;

/// One training example: feature values plus its label.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    features: Vec<Value>,
    label: Value,
}

impl Row {
    /// Return the feature values in column order.
    #[must_use]
    pub fn features(&self) -> &[Value] {
        &self.features
    }

    /// Return the value of a single feature column.
    #[must_use]
    pub fn feature(&self, feature: FeatureIndex) -> &Value {
        &self.features[feature.index()]
    }

    /// Return the label.
    #[must_use]
    pub fn label(&self) -> &Value {
        &self.label
    }
}

/// An ordered, rectangular set of labeled rows.
///
/// Construct via [`Dataset::from_table`] (label in the last column) or
/// [`Dataset::from_xy`] (separate label sequence). Both validate the input
/// and reject malformed tables before any training work happens. An empty
/// table is accepted and yields an empty dataset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    rows: Vec<Row>,
    n_features: usize,
    schema: Option<TableSchema>,
}

impl Dataset {
    /// Build a dataset from rows whose last column is the label.
    ///
    /// # Errors
    ///
    /// | Variant                                | When                                  |
    /// |----------------------------------------|---------------------------------------|
    /// | [`ForestError::EmptyRow`]              | a row has no columns                  |
    /// | [`ForestError::ZeroFeatures`]          | rows hold only a label                |
    /// | [`ForestError::FeatureCountMismatch`]  | rows have inconsistent lengths        |
    /// | [`ForestError::NonFiniteValue`]        | a numeric feature is NaN or infinite  |
    /// | [`ForestError::NonFiniteLabel`]        | a numeric label is NaN or infinite    |
    pub fn from_table(table: Vec<Vec<Value>>) -> Result<Self, ForestError> {
        let mut features = Vec::with_capacity(table.len());
        let mut labels = Vec::with_capacity(table.len());
        for (row_index, mut row) in table.into_iter().enumerate() {
            let label = row.pop().ok_or(ForestError::EmptyRow { row_index })?;
            features.push(row);
            labels.push(label);
        }
        Self::from_xy(features, labels)
    }

    /// Build a dataset from a feature table and a parallel label sequence.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::LabelCountMismatch`] when the lengths differ,
    /// and otherwise the same errors as [`Dataset::from_table`].
    pub fn from_xy(features: Vec<Vec<Value>>, labels: Vec<Value>) -> Result<Self, ForestError> {
        if features.len() != labels.len() {
            return Err(ForestError::LabelCountMismatch {
                n_samples: features.len(),
                n_labels: labels.len(),
            });
        }
        let Some(first) = features.first() else {
            return Ok(Self::default());
        };
        let n_features = first.len();
        if n_features == 0 {
            return Err(ForestError::ZeroFeatures);
        }

        let mut rows = Vec::with_capacity(features.len());
        for (sample_index, (row, label)) in features.into_iter().zip(labels).enumerate() {
            if row.len() != n_features {
                return Err(ForestError::FeatureCountMismatch {
                    expected: n_features,
                    got: row.len(),
                    sample_index,
                });
            }
            if let Some(feature_index) = row.iter().position(|v| !v.is_finite()) {
                return Err(ForestError::NonFiniteValue {
                    sample_index,
                    feature_index,
                });
            }
            if !label.is_finite() {
                return Err(ForestError::NonFiniteLabel { sample_index });
            }
            rows.push(Row {
                features: row.into_iter().map(normalize).collect(),
                label: normalize(label),
            });
        }

        Ok(Self {
            rows,
            n_features,
            schema: None,
        })
    }

    /// Attach the column names and kinds the rows were read with.
    ///
    /// Forests fitted on this dataset keep the schema, and it is saved with
    /// them.
    ///
    /// # Errors
    ///
    /// | Variant | When |
    /// |---|---|
    /// | [`ForestError::SchemaWidthMismatch`] | the schema covers a different number of features |
    /// | [`ForestError::SchemaTypeMismatch`] | a feature value does not have its column's kind |
    pub fn with_schema(mut self, schema: TableSchema) -> Result<Self, ForestError> {
        if !self.is_empty() && schema.n_features() != self.n_features {
            return Err(ForestError::SchemaWidthMismatch {
                expected: self.n_features,
                got: schema.n_features(),
            });
        }
        for (sample_index, row) in self.rows.iter().enumerate() {
            let mismatch = row
                .features
                .iter()
                .zip(schema.feature_kinds())
                .position(|(value, kind)| !kind.admits(value));
            if let Some(feature_index) = mismatch {
                return Err(ForestError::SchemaTypeMismatch {
                    sample_index,
                    feature_index,
                    expected: schema.feature_kinds()[feature_index],
                });
            }
        }
        self.schema = Some(schema);
        Ok(self)
    }

    /// Return the attached schema, if any.
    #[must_use]
    pub fn schema(&self) -> Option<&TableSchema> {
        self.schema.as_ref()
    }

    /// Return the rows in their original order.
    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Return a single row.
    ///
    /// # Panics
    ///
    /// Panics if `index >= n_samples()`.
    #[must_use]
    pub fn row(&self, index: usize) -> &Row {
        &self.rows[index]
    }

    /// Return the number of rows.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.rows.len()
    }

    /// Return the number of feature columns (0 for an empty dataset).
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Return `true` when the dataset has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterate over the labels in row order.
    pub fn labels(&self) -> impl Iterator<Item = &Value> {
        self.rows.iter().map(Row::label)
    }

    /// Return a new dataset holding the rows at `indices`, in that order.
    ///
    /// Indices may repeat; each occurrence produces its own copy of the row.
    ///
    /// # Panics
    ///
    /// Panics if any index is out of bounds.
    #[must_use]
    pub fn subset(&self, indices: &[usize]) -> Self {
        Self {
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
            n_features: self.n_features,
            schema: self.schema.clone(),
        }
    }
}

fn normalize(value: Value) -> Value {
    match value {
        Value::Numeric(x) => Value::numeric(x),
        categorical => categorical,
    }
}
