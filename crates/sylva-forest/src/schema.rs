//! Column names and types fixed when a table is first loaded.

use serde::{Deserialize, Serialize};

use crate::error::ForestError;
use crate::value::Value;

/// Resolved type of a table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// Every cell is a finite number.
    Numeric,
    /// Cells are kept as strings, even when they look like numbers.
    Categorical,
}

impl ColumnKind {
    /// Return `true` when `value` has this column's type.
    #[must_use]
    pub fn admits(self, value: &Value) -> bool {
        matches!(
            (self, value),
            (ColumnKind::Numeric, Value::Numeric(_)) | (ColumnKind::Categorical, Value::Categorical(_))
        )
    }
}

impl std::fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColumnKind::Numeric => f.write_str("numeric"),
            ColumnKind::Categorical => f.write_str("categorical"),
        }
    }
}

/// Names and types of the feature columns a model was trained on.
///
/// Attached to a [`Dataset`](crate::Dataset) with
/// [`with_schema`](crate::Dataset::with_schema) and carried into every
/// forest fitted from it, so that rows scored later can be read by column
/// name with the training types instead of re-guessing them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    feature_names: Vec<String>,
    feature_kinds: Vec<ColumnKind>,
    label_kind: Option<ColumnKind>,
}

impl TableSchema {
    /// Pair each feature name with its kind.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::SchemaLengthMismatch`] | the name and kind lists differ in length |
    /// | [`ForestError::DuplicateFeatureName`] | a name appears twice |
    pub fn new(feature_names: Vec<String>, feature_kinds: Vec<ColumnKind>) -> Result<Self, ForestError> {
        if feature_names.len() != feature_kinds.len() {
            return Err(ForestError::SchemaLengthMismatch {
                n_names: feature_names.len(),
                n_kinds: feature_kinds.len(),
            });
        }
        for (i, name) in feature_names.iter().enumerate() {
            if feature_names[..i].contains(name) {
                return Err(ForestError::DuplicateFeatureName { name: name.clone() });
            }
        }
        Ok(Self {
            feature_names,
            feature_kinds,
            label_kind: None,
        })
    }

    /// Record the type of the label column.
    #[must_use]
    pub fn with_label_kind(mut self, label_kind: ColumnKind) -> Self {
        self.label_kind = Some(label_kind);
        self
    }

    /// Feature column names in model order.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Feature column kinds in model order.
    #[must_use]
    pub fn feature_kinds(&self) -> &[ColumnKind] {
        &self.feature_kinds
    }

    /// Label column kind, when recorded.
    #[must_use]
    pub fn label_kind(&self) -> Option<ColumnKind> {
        self.label_kind
    }

    /// Number of feature columns.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Iterate over `(name, kind)` pairs in model order.
    pub fn columns(&self) -> impl Iterator<Item = (&str, ColumnKind)> {
        self.feature_names
            .iter()
            .map(String::as_str)
            .zip(self.feature_kinds.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairs_names_with_kinds() {
        let schema = TableSchema::new(
            vec!["pages".into(), "country".into()],
            vec![ColumnKind::Numeric, ColumnKind::Categorical],
        )
        .unwrap()
        .with_label_kind(ColumnKind::Categorical);

        let columns: Vec<_> = schema.columns().collect();
        assert_eq!(
            columns,
            vec![("pages", ColumnKind::Numeric), ("country", ColumnKind::Categorical)]
        );
        assert_eq!(schema.n_features(), 2);
        assert_eq!(schema.label_kind(), Some(ColumnKind::Categorical));
    }

    #[test]
    fn length_mismatch_rejected() {
        let err = TableSchema::new(vec!["a".into()], vec![]).unwrap_err();
        assert!(matches!(err, ForestError::SchemaLengthMismatch { n_names: 1, n_kinds: 0 }));
    }

    #[test]
    fn duplicate_name_rejected() {
        let err = TableSchema::new(
            vec!["a".into(), "a".into()],
            vec![ColumnKind::Numeric, ColumnKind::Numeric],
        )
        .unwrap_err();
        assert!(matches!(err, ForestError::DuplicateFeatureName { ref name } if name == "a"));
    }

    #[test]
    fn kind_admits_matching_values_only() {
        assert!(ColumnKind::Numeric.admits(&Value::from(10.0)));
        assert!(!ColumnKind::Numeric.admits(&Value::from("10")));
        assert!(ColumnKind::Categorical.admits(&Value::from("10")));
        assert_eq!(ColumnKind::Categorical.to_string(), "categorical");
    }
}
