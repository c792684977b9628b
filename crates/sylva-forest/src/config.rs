//! Configuration builder for Random Forest training.

use crate::dataset::Dataset;
use crate::error::ForestError;
use crate::result::RandomForestResult;
use crate::value::Value;

/// How each tree's training rows are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingMode {
    /// Draw `floor(bootstrap_fraction * n)` row indices uniformly with replacement.
    Bootstrap,
    /// Train every tree on the full dataset in its original order.
    Disabled,
}

/// Whether to compute out-of-bag evaluation during training.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OobMode {
    /// Compute OOB accuracy.
    Enabled,
    /// Skip OOB evaluation.
    Disabled,
}

/// Configuration for Random Forest training.
///
/// Construct via [`RandomForestConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter            | Default     |
/// |----------------------|-------------|
/// | `max_depth`          | `None`      |
/// | `bootstrap_fraction` | 1.0         |
/// | `seed`               | 42          |
/// | `sampling`           | `Bootstrap` |
/// | `oob_mode`           | `Disabled`  |
///
/// `bootstrap_fraction` defaults to 1.0 rather than 0.5 so that each tree
/// draws as many rows as the dataset holds. At 0.5 a one-row dataset would
/// draw `floor(0.5) = 0` rows and fail with
/// [`ForestError::EmptyBootstrapSample`]; pass `with_bootstrap_fraction(0.5)`
/// to get half-size samples.
#[derive(Debug, Clone)]
pub struct RandomForestConfig {
    pub(crate) n_trees: usize,
    pub(crate) max_depth: Option<usize>,
    pub(crate) bootstrap_fraction: f64,
    pub(crate) seed: u64,
    pub(crate) sampling: SamplingMode,
    pub(crate) oob_mode: OobMode,
}

impl RandomForestConfig {
    /// Create a new config with the given number of trees.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::InvalidTreeCount`] if `n_trees` is zero.
    pub fn new(n_trees: usize) -> Result<Self, ForestError> {
        if n_trees == 0 {
            return Err(ForestError::InvalidTreeCount { n_trees });
        }
        Ok(Self {
            n_trees,
            max_depth: None,
            bootstrap_fraction: 1.0,
            seed: 42,
            sampling: SamplingMode::Bootstrap,
            oob_mode: OobMode::Disabled,
        })
    }

    // --- Setters ---

    /// Set the per-tree maximum depth. `None` means unlimited.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the bootstrap fraction (proportion of rows drawn per tree).
    ///
    /// Checked at [`fit`](Self::fit) time; must be in (0.0, 1.0].
    #[must_use]
    pub fn with_bootstrap_fraction(mut self, bootstrap_fraction: f64) -> Self {
        self.bootstrap_fraction = bootstrap_fraction;
        self
    }

    /// Set the random seed for reproducibility.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set how per-tree training rows are chosen.
    #[must_use]
    pub fn with_sampling(mut self, sampling: SamplingMode) -> Self {
        self.sampling = sampling;
        self
    }

    /// Set the OOB evaluation mode.
    #[must_use]
    pub fn with_oob_mode(mut self, oob_mode: OobMode) -> Self {
        self.oob_mode = oob_mode;
        self
    }

    // --- Getters ---

    /// Return the number of trees.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.n_trees
    }

    /// Return the per-tree maximum depth, if any.
    #[must_use]
    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// Return the bootstrap fraction.
    #[must_use]
    pub fn bootstrap_fraction(&self) -> f64 {
        self.bootstrap_fraction
    }

    /// Return the random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Return the sampling mode.
    #[must_use]
    pub fn sampling(&self) -> SamplingMode {
        self.sampling
    }

    /// Return the OOB evaluation mode.
    #[must_use]
    pub fn oob_mode(&self) -> OobMode {
        self.oob_mode
    }

    /// Train a Random Forest on a validated dataset.
    ///
    /// # Errors
    ///
    /// | Variant                                   | When                                          |
    /// |-------------------------------------------|-----------------------------------------------|
    /// | [`ForestError::EmptyDataset`]             | `dataset` has no rows                         |
    /// | [`ForestError::InvalidBootstrapFraction`] | bootstrap_fraction is not in (0.0, 1.0]       |
    /// | [`ForestError::EmptyBootstrapSample`]     | the fraction draws zero rows                  |
    /// | [`ForestError::OobEvaluationFailed`]      | OOB enabled but no sample has any OOB tree    |
    pub fn fit(&self, dataset: &Dataset) -> Result<RandomForestResult, ForestError> {
        crate::forest::train(self, dataset)
    }

    /// Train on rows whose last column is the label.
    ///
    /// # Errors
    ///
    /// Validation errors from [`Dataset::from_table`], then those of [`fit`](Self::fit).
    pub fn fit_table(&self, table: Vec<Vec<Value>>) -> Result<RandomForestResult, ForestError> {
        self.fit(&Dataset::from_table(table)?)
    }

    /// Train on a feature table and a parallel label sequence.
    ///
    /// # Errors
    ///
    /// Validation errors from [`Dataset::from_xy`], then those of [`fit`](Self::fit).
    pub fn fit_xy(
        &self,
        features: Vec<Vec<Value>>,
        labels: Vec<Value>,
    ) -> Result<RandomForestResult, ForestError> {
        self.fit(&Dataset::from_xy(features, labels)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = RandomForestConfig::new(10).unwrap();
        assert_eq!(config.n_trees(), 10);
        assert_eq!(config.max_depth(), None);
        assert!((config.bootstrap_fraction() - 1.0).abs() < f64::EPSILON);
        assert_eq!(config.seed(), 42);
        assert_eq!(config.sampling(), SamplingMode::Bootstrap);
        assert_eq!(config.oob_mode(), OobMode::Disabled);
    }

    #[test]
    fn builders_chain() {
        let config = RandomForestConfig::new(3)
            .unwrap()
            .with_max_depth(Some(4))
            .with_bootstrap_fraction(0.5)
            .with_seed(7)
            .with_sampling(SamplingMode::Disabled)
            .with_oob_mode(OobMode::Enabled);
        assert_eq!(config.max_depth(), Some(4));
        assert!((config.bootstrap_fraction() - 0.5).abs() < f64::EPSILON);
        assert_eq!(config.seed(), 7);
        assert_eq!(config.sampling(), SamplingMode::Disabled);
        assert_eq!(config.oob_mode(), OobMode::Enabled);
    }

    #[test]
    fn default_fraction_trains_single_row() {
        let result = RandomForestConfig::new(3)
            .unwrap()
            .fit_table(vec![vec![Value::from(5.0), Value::from("X")]])
            .unwrap();
        assert_eq!(result.metadata().draw_count, 1);
        assert_eq!(result.forest().predict(&[Value::from(0.0)]).unwrap(), Value::from("X"));

        let err = RandomForestConfig::new(3)
            .unwrap()
            .with_bootstrap_fraction(0.5)
            .fit_table(vec![vec![Value::from(5.0), Value::from("X")]])
            .unwrap_err();
        assert!(matches!(err, ForestError::EmptyBootstrapSample { n_samples: 1, .. }));
    }

    #[test]
    fn zero_trees_rejected() {
        let err = RandomForestConfig::new(0).unwrap_err();
        assert!(matches!(err, ForestError::InvalidTreeCount { n_trees: 0 }));
    }
}
