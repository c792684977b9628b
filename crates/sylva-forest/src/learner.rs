//! Common interface over single trees and forests for evaluation.

use crate::config::RandomForestConfig;
use crate::dataset::Dataset;
use crate::error::ForestError;
use crate::forest::RandomForest;
use crate::tree::{DecisionTree, DecisionTreeConfig};
use crate::value::Value;

/// A trained model that maps feature rows to labels.
pub trait Classifier {
    /// Predict one label per row, in input order.
    ///
    /// # Errors
    ///
    /// Any prediction error of the underlying model.
    fn classify(&self, samples: &[Vec<Value>]) -> Result<Vec<Value>, ForestError>;
}

/// A configuration that can be trained into a [`Classifier`].
pub trait Learner: Clone {
    /// The fitted model type.
    type Model: Classifier;

    /// Train on `dataset`.
    ///
    /// # Errors
    ///
    /// Any training error of the underlying configuration.
    fn fit_dataset(&self, dataset: &Dataset) -> Result<Self::Model, ForestError>;

    /// Return a copy trained with a different seed, for learners that use one.
    #[must_use]
    fn reseeded(&self, _seed: u64) -> Self {
        self.clone()
    }
}

impl Classifier for DecisionTree {
    fn classify(&self, samples: &[Vec<Value>]) -> Result<Vec<Value>, ForestError> {
        self.predict_batch(samples)
    }
}

impl Classifier for RandomForest {
    fn classify(&self, samples: &[Vec<Value>]) -> Result<Vec<Value>, ForestError> {
        self.predict_batch(samples)
    }
}

impl Learner for DecisionTreeConfig {
    type Model = DecisionTree;

    fn fit_dataset(&self, dataset: &Dataset) -> Result<DecisionTree, ForestError> {
        Ok(self.fit(dataset))
    }
}

impl Learner for RandomForestConfig {
    type Model = RandomForest;

    fn fit_dataset(&self, dataset: &Dataset) -> Result<RandomForest, ForestError> {
        Ok(self.fit(dataset)?.into_forest())
    }

    fn reseeded(&self, seed: u64) -> Self {
        self.clone().with_seed(seed)
    }
}
