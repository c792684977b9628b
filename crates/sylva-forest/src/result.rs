//! What a forest fit hands back besides the model itself.

use crate::forest::RandomForest;
use crate::oob::OobScore;

/// Shape of the data a forest was fitted on.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct TrainingMetadata {
    /// Trees in the ensemble.
    pub n_trees: usize,
    /// Feature columns per row.
    pub n_features: usize,
    /// Distinct labels seen in training.
    pub n_labels: usize,
    /// Rows in the training dataset.
    pub n_samples: usize,
    /// Rows drawn per tree.
    pub draw_count: usize,
}

/// A fitted forest together with its out-of-bag bookkeeping.
#[derive(Debug)]
pub struct RandomForestResult {
    forest: RandomForest,
    oob_score: Option<OobScore>,
    oob_indices_per_tree: Vec<Vec<usize>>,
    metadata: TrainingMetadata,
}

impl RandomForestResult {
    pub(crate) fn new(
        forest: RandomForest,
        oob_score: Option<OobScore>,
        oob_indices_per_tree: Vec<Vec<usize>>,
        metadata: TrainingMetadata,
    ) -> Self {
        Self {
            forest,
            oob_score,
            oob_indices_per_tree,
            metadata,
        }
    }

    /// The trained ensemble.
    #[must_use]
    pub fn forest(&self) -> &RandomForest {
        &self.forest
    }

    /// Drop the bookkeeping and keep the ensemble.
    #[must_use]
    pub fn into_forest(self) -> RandomForest {
        self.forest
    }

    /// Out-of-bag accuracy, present only under [`OobMode::Enabled`](crate::OobMode::Enabled).
    #[must_use]
    pub fn oob_score(&self) -> Option<&OobScore> {
        self.oob_score.as_ref()
    }

    /// Counts describing the training run.
    #[must_use]
    pub fn metadata(&self) -> &TrainingMetadata {
        &self.metadata
    }

    /// Row indices never drawn by each tree, in tree order.
    ///
    /// Empty for every tree when sampling is disabled.
    #[must_use]
    pub fn oob_indices_per_tree(&self) -> &[Vec<usize>] {
        &self.oob_indices_per_tree
    }
}
