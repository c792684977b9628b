//! Majority-vote prediction for the Random Forest ensemble.

use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::error::ForestError;
use crate::forest::RandomForest;
use crate::impurity::LabelCounts;
use crate::schema::TableSchema;
use crate::value::Value;

/// Outcome of one row's vote across the ensemble.
#[derive(Debug, Clone, PartialEq)]
pub struct Vote {
    /// Winning label; ties go to the smallest label.
    pub label: Value,
    /// Number of trees that predicted `label`.
    pub votes: usize,
    /// Number of trees that voted.
    pub n_trees: usize,
}

impl Vote {
    /// Fraction of trees agreeing with the winning label, in (0, 1].
    #[must_use]
    pub fn confidence(&self) -> f64 {
        self.votes as f64 / self.n_trees as f64
    }
}

/// Labels and confidences for a batch of rows, both in input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForestPrediction {
    /// Predicted label per row.
    pub labels: Vec<Value>,
    /// Winning vote share per row.
    pub confidences: Vec<f64>,
}

impl ForestPrediction {
    /// Return the number of predicted rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Return `true` when no rows were predicted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl FromIterator<Vote> for ForestPrediction {
    fn from_iter<I: IntoIterator<Item = Vote>>(iter: I) -> Self {
        let mut prediction = Self::default();
        for vote in iter {
            prediction.confidences.push(vote.confidence());
            prediction.labels.push(vote.label);
        }
        prediction
    }
}

impl RandomForest {
    /// Tally every tree's prediction for a single sample.
    ///
    /// # Errors
    ///
    /// | Variant                                    | When                                   |
    /// |--------------------------------------------|----------------------------------------|
    /// | [`ForestError::PredictionFeatureMismatch`] | `sample.len() != n_features`           |
    /// | [`ForestError::NoMajorityLabel`]           | a member tree is degenerate            |
    pub fn vote(&self, sample: &[Value]) -> Result<Vote, ForestError> {
        if sample.len() != self.n_features {
            return Err(ForestError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: sample.len(),
            });
        }

        let mut tally = LabelCounts::new();
        for tree in &self.trees {
            tally.add(&tree.predict(sample)?);
        }
        let (label, votes) = tally.majority().ok_or(ForestError::NoMajorityLabel)?;

        Ok(Vote {
            label: label.clone(),
            votes,
            n_trees: self.trees.len(),
        })
    }

    /// Predict the label for a single sample.
    ///
    /// # Errors
    ///
    /// See [`RandomForest::vote`].
    pub fn predict(&self, sample: &[Value]) -> Result<Value, ForestError> {
        Ok(self.vote(sample)?.label)
    }

    /// Predict labels for a batch of samples in parallel.
    ///
    /// # Errors
    ///
    /// The first error from [`RandomForest::vote`].
    pub fn predict_batch(&self, samples: &[Vec<Value>]) -> Result<Vec<Value>, ForestError> {
        samples
            .into_par_iter()
            .map(|sample| self.predict(sample))
            .collect()
    }

    /// Predict labels and confidences for a batch of samples in parallel.
    ///
    /// # Errors
    ///
    /// The first error from [`RandomForest::vote`].
    pub fn predict_with_confidence(
        &self,
        samples: &[Vec<Value>],
    ) -> Result<ForestPrediction, ForestError> {
        let votes: Vec<Vote> = samples
            .into_par_iter()
            .map(|sample| self.vote(sample))
            .collect::<Result<_, _>>()?;
        Ok(votes.into_iter().collect())
    }

    /// Return the number of features this forest was trained on.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Return the column names and kinds the forest was trained with.
    ///
    /// `None` when the training dataset carried no schema.
    #[must_use]
    pub fn schema(&self) -> Option<&TableSchema> {
        self.schema.as_ref()
    }

    /// Return the number of trees in the ensemble.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

#[cfg(test)]
mod tests {
    use super::Vote;
    use crate::dataset::Dataset;
    use crate::forest::RandomForest;
    use crate::tree::DecisionTreeConfig;
    use crate::value::Value;
    use crate::ForestError;

    fn constant_tree(label: &str) -> crate::tree::DecisionTree {
        let ds = Dataset::from_table(vec![vec![Value::from(0.0), Value::from(label)]]).unwrap();
        DecisionTreeConfig::new().fit(&ds)
    }

    fn forest_of(labels: &[&str]) -> RandomForest {
        RandomForest {
            trees: labels.iter().map(|l| constant_tree(l)).collect(),
            n_features: 1,
            schema: None,
        }
    }

    #[test]
    fn majority_wins_with_confidence() {
        let forest = forest_of(&["no", "yes", "yes"]);
        let vote = forest.vote(&[Value::from(1.0)]).unwrap();
        assert_eq!(vote.label, Value::from("yes"));
        assert_eq!(vote.votes, 2);
        assert!((vote.confidence() - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn ties_go_to_smallest_label() {
        let forest = forest_of(&["zulu", "alpha", "zulu", "alpha"]);
        let vote = forest.vote(&[Value::from(1.0)]).unwrap();
        assert_eq!(vote.label, Value::from("alpha"));
        assert!((vote.confidence() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn unanimous_confidence_is_one() {
        let forest = forest_of(&["x", "x"]);
        let vote = forest.vote(&[Value::from(3.0)]).unwrap();
        assert!((vote.confidence() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn batch_preserves_order_and_bounds() {
        let ds = Dataset::from_table(vec![
            vec![Value::from(1.0), Value::from("A")],
            vec![Value::from(2.0), Value::from("B")],
        ])
        .unwrap();
        let tree = DecisionTreeConfig::new().fit(&ds);
        let forest = RandomForest {
            trees: vec![tree.clone(), tree, constant_tree("A")],
            n_features: 1,
            schema: None,
        };
        let rows = vec![vec![Value::from(2.0)], vec![Value::from(1.0)], vec![Value::from(5.0)]];
        let prediction = forest.predict_with_confidence(&rows).unwrap();
        assert_eq!(prediction.len(), 3);
        assert_eq!(
            prediction.labels,
            vec![Value::from("B"), Value::from("A"), Value::from("B")]
        );
        assert!((prediction.confidences[1] - 1.0).abs() < f64::EPSILON);
        for c in &prediction.confidences {
            assert!(*c > 0.0 && *c <= 1.0);
        }
        assert_eq!(forest.predict_batch(&rows).unwrap(), prediction.labels);
    }

    #[test]
    fn degenerate_member_fails() {
        let forest = RandomForest {
            trees: vec![constant_tree("A"), DecisionTreeConfig::new().fit(&Dataset::default())],
            n_features: 1,
            schema: None,
        };
        let err = forest.vote(&[Value::from(0.0)]).unwrap_err();
        assert!(matches!(err, ForestError::NoMajorityLabel));
    }

    #[test]
    fn wrong_width_rejected() {
        let forest = forest_of(&["a"]);
        let err = forest.predict(&[Value::from(1.0), Value::from(2.0)]).unwrap_err();
        assert!(matches!(
            err,
            ForestError::PredictionFeatureMismatch { expected: 1, got: 2 }
        ));
    }

    #[test]
    fn vote_confidence_ratio() {
        let vote = Vote { label: Value::from(1.0), votes: 3, n_trees: 4 };
        assert!((vote.confidence() - 0.75).abs() < f64::EPSILON);
    }
}
