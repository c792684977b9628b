//! Model serialization and deserialization via bincode.

use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument};

use crate::error::ForestError;
use crate::forest::RandomForest;
use crate::tree::DecisionTree;

/// Current binary format version.
///
/// Version 2 stores the forest's [`TableSchema`](crate::TableSchema).
pub const FORMAT_VERSION: u32 = 2;

/// Leading fields shared by every envelope, decoded first to check the version.
#[derive(serde::Deserialize)]
struct EnvelopeHeader {
    format_version: u32,
}

/// Versioned envelope for a serialized model.
#[derive(serde::Serialize, serde::Deserialize)]
struct ModelEnvelope<M> {
    /// Format version for compatibility checking.
    format_version: u32,
    /// Number of features the model was trained on.
    n_features: usize,
    /// The serialized model.
    model: M,
}

fn write_model<M: Serialize>(model: &M, n_features: usize, path: &Path) -> Result<usize, ForestError> {
    let envelope = ModelEnvelope {
        format_version: FORMAT_VERSION,
        n_features,
        model,
    };

    let bytes =
        bincode::serialize(&envelope).map_err(|e| ForestError::SerializeModel { source: e })?;

    std::fs::write(path, &bytes).map_err(|e| ForestError::WriteModel {
        path: path.to_path_buf(),
        source: e,
    })?;

    Ok(bytes.len())
}

fn read_model<M: DeserializeOwned>(path: &Path) -> Result<ModelEnvelope<M>, ForestError> {
    let bytes = std::fs::read(path).map_err(|e| ForestError::ReadModel {
        path: path.to_path_buf(),
        source: e,
    })?;

    let deserialize_error = |e| ForestError::DeserializeModel {
        path: path.to_path_buf(),
        source: e,
    };

    let header: EnvelopeHeader = bincode::deserialize(&bytes).map_err(deserialize_error)?;
    if header.format_version != FORMAT_VERSION {
        return Err(ForestError::IncompatibleModelVersion {
            expected: FORMAT_VERSION,
            found: header.format_version,
            path: path.to_path_buf(),
        });
    }

    bincode::deserialize(&bytes).map_err(deserialize_error)
}

impl RandomForest {
    /// Save the model to a binary file.
    ///
    /// Uses bincode encoding wrapped in a versioned envelope for
    /// forward-compatibility checking.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::SerializeModel`] | bincode encoding failed |
    /// | [`ForestError::WriteModel`] | file write failed |
    #[instrument(skip(self), fields(path = %path.as_ref().display()))]
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ForestError> {
        let size_bytes = write_model(self, self.n_features, path.as_ref())?;
        info!(size_bytes, n_trees = self.trees.len(), "model saved");
        Ok(())
    }

    /// Load a model from a binary file.
    ///
    /// Checks the format version before decoding the model body.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::ReadModel`] | file read failed |
    /// | [`ForestError::DeserializeModel`] | bincode decoding failed |
    /// | [`ForestError::IncompatibleModelVersion`] | format version mismatch |
    #[instrument(fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ForestError> {
        let envelope: ModelEnvelope<Self> = read_model(path.as_ref())?;
        debug!(
            n_trees = envelope.model.trees.len(),
            n_features = envelope.n_features,
            "model loaded"
        );
        Ok(envelope.model)
    }
}

impl DecisionTree {
    /// Save the tree to a binary file in the same envelope as forests.
    ///
    /// # Errors
    ///
    /// See [`RandomForest::save`].
    #[instrument(skip(self), fields(path = %path.as_ref().display()))]
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ForestError> {
        let size_bytes = write_model(self, self.n_features, path.as_ref())?;
        info!(size_bytes, n_nodes = self.nodes.len(), "tree saved");
        Ok(())
    }

    /// Load a tree from a binary file.
    ///
    /// # Errors
    ///
    /// See [`RandomForest::load`].
    #[instrument(fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ForestError> {
        let envelope: ModelEnvelope<Self> = read_model(path.as_ref())?;
        debug!(n_nodes = envelope.model.nodes.len(), "tree loaded");
        Ok(envelope.model)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::{FORMAT_VERSION, ModelEnvelope};
    use crate::config::RandomForestConfig;
    use crate::dataset::Dataset;
    use crate::schema::{ColumnKind, TableSchema};
    use crate::forest::RandomForest;
    use crate::tree::{DecisionTree, DecisionTreeConfig};
    use crate::value::Value;
    use crate::ForestError;

    fn table() -> Vec<Vec<Value>> {
        vec![
            vec![Value::from(1.0), Value::from("uk"), Value::from("no")],
            vec![Value::from(2.0), Value::from("uk"), Value::from("no")],
            vec![Value::from(3.0), Value::from("us"), Value::from("no")],
            vec![Value::from(10.0), Value::from("us"), Value::from("yes")],
            vec![Value::from(11.0), Value::from("fr"), Value::from("yes")],
            vec![Value::from(12.0), Value::from("us"), Value::from("yes")],
        ]
    }

    fn samples() -> Vec<Vec<Value>> {
        vec![
            vec![Value::from(1.5), Value::from("uk")],
            vec![Value::from(11.0), Value::from("us")],
            vec![Value::from(5.0), Value::from("de")],
        ]
    }

    #[test]
    fn forest_round_trip_identical_predictions() {
        let dir = TempDir::new().unwrap();
        let model_path = dir.path().join("model.bin");

        let forest = RandomForestConfig::new(5)
            .unwrap()
            .with_seed(42)
            .fit_table(table())
            .unwrap()
            .into_forest();
        forest.save(&model_path).unwrap();
        let loaded = RandomForest::load(&model_path).unwrap();

        assert_eq!(loaded.n_trees(), 5);
        assert_eq!(
            forest.predict_with_confidence(&samples()).unwrap(),
            loaded.predict_with_confidence(&samples()).unwrap()
        );
    }

    #[test]
    fn forest_schema_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("schema.bin");

        let schema = TableSchema::new(
            vec!["pages".into(), "country".into()],
            vec![ColumnKind::Numeric, ColumnKind::Categorical],
        )
        .unwrap()
        .with_label_kind(ColumnKind::Categorical);
        let dataset = Dataset::from_table(table()).unwrap().with_schema(schema.clone()).unwrap();
        RandomForestConfig::new(2)
            .unwrap()
            .fit(&dataset)
            .unwrap()
            .forest()
            .save(&path)
            .unwrap();

        let loaded = RandomForest::load(&path).unwrap();
        assert_eq!(loaded.schema(), Some(&schema));
    }

    #[test]
    fn tree_round_trip_identical_structure() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tree.bin");

        let tree = DecisionTreeConfig::new().fit_table(table()).unwrap();
        tree.save(&path).unwrap();
        let loaded = DecisionTree::load(&path).unwrap();

        assert_eq!(tree.to_string(), loaded.to_string());
        assert_eq!(
            tree.predict_batch(&samples()).unwrap(),
            loaded.predict_batch(&samples()).unwrap()
        );
    }

    #[test]
    fn load_nonexistent_file_error() {
        let dir = TempDir::new().unwrap();
        let err = RandomForest::load(dir.path().join("missing.bin")).unwrap_err();
        assert!(matches!(err, ForestError::ReadModel { .. }));
    }

    #[test]
    fn load_corrupt_file_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("corrupt.bin");
        std::fs::write(&path, b"no").unwrap();
        let err = RandomForest::load(&path).unwrap_err();
        assert!(matches!(err, ForestError::DeserializeModel { .. }));
    }

    #[test]
    fn future_version_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("future.bin");
        let envelope = ModelEnvelope {
            format_version: FORMAT_VERSION + 1,
            n_features: 0,
            model: (),
        };
        std::fs::write(&path, bincode::serialize(&envelope).unwrap()).unwrap();

        let err = RandomForest::load(&path).unwrap_err();
        assert!(matches!(
            err,
            ForestError::IncompatibleModelVersion { expected: FORMAT_VERSION, found, .. }
                if found == FORMAT_VERSION + 1
        ));
    }
}
