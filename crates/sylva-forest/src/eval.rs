//! Accuracy scoring and stratified k-fold cross-validation.

use std::collections::BTreeMap;

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use tracing::{info, instrument};

use crate::confusion::ConfusionMatrix;
use crate::dataset::Dataset;
use crate::error::ForestError;
use crate::learner::{Classifier, Learner};
use crate::value::Value;

/// Fraction of positions where `predicted` equals `true_labels`.
///
/// Returns 0.0 for empty input. Extra elements of the longer slice are ignored.
#[must_use]
pub fn accuracy(true_labels: &[Value], predicted: &[Value]) -> f64 {
    let n = true_labels.len().min(predicted.len());
    if n == 0 {
        return 0.0;
    }
    let correct = true_labels
        .iter()
        .zip(predicted)
        .filter(|&(t, p)| t == p)
        .count();
    correct as f64 / n as f64
}

/// Cross-validation configuration.
///
/// Construct via [`CrossValidation::new`], then chain `with_seed` if desired.
#[derive(Debug, Clone)]
pub struct CrossValidation {
    n_folds: usize,
    seed: u64,
}

/// Results of stratified k-fold cross-validation.
#[derive(Debug)]
pub struct CrossValidationResult {
    /// Accuracy for each fold.
    pub fold_accuracies: Vec<f64>,
    /// Aggregated confusion matrix (summed across all folds).
    pub confusion_matrix: ConfusionMatrix,
    /// Mean accuracy across folds.
    pub mean_accuracy: f64,
    /// Population standard deviation of fold accuracies.
    pub std_accuracy: f64,
    /// Number of folds.
    pub n_folds: usize,
    /// Total number of samples.
    pub n_samples: usize,
    /// Number of features.
    pub n_features: usize,
    /// Number of distinct labels.
    pub n_labels: usize,
}

impl CrossValidation {
    /// Create a new cross-validation config with the given number of folds.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::InvalidFoldCount`] if `n_folds` < 2.
    pub fn new(n_folds: usize) -> Result<Self, ForestError> {
        if n_folds < 2 {
            return Err(ForestError::InvalidFoldCount { n_folds });
        }
        Ok(Self { n_folds, seed: 42 })
    }

    /// Set the random seed for fold shuffling.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Return the number of folds.
    #[must_use]
    pub fn n_folds(&self) -> usize {
        self.n_folds
    }

    /// Run stratified k-fold cross-validation.
    ///
    /// Each fold trains `learner` on the remaining folds and scores it on the
    /// held-out fold. Learners with a seed are reseeded per fold.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::EmptyDataset`] | Zero samples |
    /// | [`ForestError::TooFewSamplesForFolds`] | A label has fewer samples than folds |
    /// | Other errors | From underlying training or prediction |
    #[instrument(skip_all, fields(n_folds = self.n_folds, n_samples = dataset.n_samples()))]
    pub fn evaluate<L: Learner>(
        &self,
        learner: &L,
        dataset: &Dataset,
    ) -> Result<CrossValidationResult, ForestError> {
        if dataset.is_empty() {
            return Err(ForestError::EmptyDataset);
        }

        let (fold_assignments, n_labels) = self.stratified_split(dataset)?;

        let mut fold_accuracies = Vec::with_capacity(self.n_folds);
        let mut all_true_labels = Vec::with_capacity(dataset.n_samples());
        let mut all_predicted = Vec::with_capacity(dataset.n_samples());

        for fold in 0..self.n_folds {
            let (test_idx, train_idx): (Vec<usize>, Vec<usize>) =
                (0..dataset.n_samples()).partition(|&i| fold_assignments[i] == fold);

            let train = dataset.subset(&train_idx);
            let test = dataset.subset(&test_idx);
            let test_features: Vec<Vec<Value>> =
                test.rows().iter().map(|r| r.features().to_vec()).collect();
            let test_labels: Vec<Value> = test.labels().cloned().collect();

            let model = learner
                .reseeded(self.seed.wrapping_add(fold as u64))
                .fit_dataset(&train)?;
            let predictions = model.classify(&test_features)?;

            let fold_accuracy = accuracy(&test_labels, &predictions);
            fold_accuracies.push(fold_accuracy);
            info!(fold, accuracy = fold_accuracy, "fold completed");

            all_true_labels.extend(test_labels);
            all_predicted.extend(predictions);
        }

        let mean_accuracy = fold_accuracies.iter().sum::<f64>() / self.n_folds as f64;
        let std_accuracy = {
            let variance = fold_accuracies
                .iter()
                .map(|&a| (a - mean_accuracy).powi(2))
                .sum::<f64>()
                / self.n_folds as f64;
            variance.sqrt()
        };

        let confusion_matrix = ConfusionMatrix::from_labels(&all_true_labels, &all_predicted)?;

        info!(mean_accuracy, std_accuracy, "cross-validation complete");

        Ok(CrossValidationResult {
            fold_accuracies,
            confusion_matrix,
            mean_accuracy,
            std_accuracy,
            n_folds: self.n_folds,
            n_samples: dataset.n_samples(),
            n_features: dataset.n_features(),
            n_labels,
        })
    }

    /// Assign every row to a fold, keeping label proportions even.
    ///
    /// Rows are grouped by label in ascending label order, shuffled within
    /// each group, then dealt round-robin across folds.
    fn stratified_split(&self, dataset: &Dataset) -> Result<(Vec<usize>, usize), ForestError> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);

        let mut by_label: BTreeMap<&Value, Vec<usize>> = BTreeMap::new();
        for (i, label) in dataset.labels().enumerate() {
            by_label.entry(label).or_default().push(i);
        }

        for (label, indices) in &by_label {
            if indices.len() < self.n_folds {
                return Err(ForestError::TooFewSamplesForFolds {
                    label: (*label).clone(),
                    count: indices.len(),
                    n_folds: self.n_folds,
                });
            }
        }

        let mut fold_assignments = vec![0usize; dataset.n_samples()];
        for indices in by_label.values_mut() {
            indices.shuffle(&mut rng);
            for (j, &idx) in indices.iter().enumerate() {
                fold_assignments[idx] = j % self.n_folds;
            }
        }

        Ok((fold_assignments, by_label.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RandomForestConfig;
    use crate::tree::DecisionTreeConfig;

    fn make_separable_data() -> Dataset {
        let mut features = Vec::new();
        let mut labels = Vec::new();
        for (band, label) in [(0.0, "low"), (10.0, "mid"), (20.0, "high")] {
            for i in 0..30 {
                features.push(vec![Value::from(band + f64::from(i) * 0.1), Value::from(0.5)]);
                labels.push(Value::from(label));
            }
        }
        Dataset::from_xy(features, labels).unwrap()
    }

    #[test]
    fn accuracy_counts_matches() {
        let t = vec![Value::from("a"), Value::from("b"), Value::from("a"), Value::from("b")];
        let p = vec![Value::from("a"), Value::from("a"), Value::from("a"), Value::from("b")];
        assert!((accuracy(&t, &p) - 0.75).abs() < f64::EPSILON);
        assert!(accuracy(&[], &[]).abs() < f64::EPSILON);
    }

    #[test]
    fn five_fold_forest_accuracy() {
        let ds = make_separable_data();
        let config = RandomForestConfig::new(15).unwrap().with_seed(42);
        let cv = CrossValidation::new(5).unwrap().with_seed(42);
        let result = cv.evaluate(&config, &ds).unwrap();

        assert!(result.mean_accuracy > 0.8, "mean_accuracy = {}", result.mean_accuracy);
        assert_eq!(result.fold_accuracies.len(), 5);
        assert_eq!(result.n_folds, 5);
        assert_eq!(result.n_samples, 90);
        assert_eq!(result.n_labels, 3);
        assert_eq!(result.confusion_matrix.total(), 90);
    }

    #[test]
    fn single_tree_cross_validation() {
        let ds = make_separable_data();
        let cv = CrossValidation::new(3).unwrap();
        let result = cv.evaluate(&DecisionTreeConfig::new(), &ds).unwrap();
        assert_eq!(result.fold_accuracies.len(), 3);
        assert!(result.mean_accuracy > 0.8, "mean_accuracy = {}", result.mean_accuracy);
        assert!(result.std_accuracy >= 0.0);
    }

    #[test]
    fn folds_are_stratified() {
        let ds = make_separable_data();
        let cv = CrossValidation::new(3).unwrap();
        let (folds, n_labels) = cv.stratified_split(&ds).unwrap();
        assert_eq!(n_labels, 3);
        for fold in 0..3 {
            for label in ["low", "mid", "high"] {
                let count = ds
                    .labels()
                    .zip(&folds)
                    .filter(|&(l, &f)| f == fold && *l == Value::from(label))
                    .count();
                assert_eq!(count, 10, "fold {fold} label {label}");
            }
        }
    }

    #[test]
    fn same_seed_same_folds() {
        let ds = make_separable_data();
        let a = CrossValidation::new(4).unwrap().with_seed(3).stratified_split(&ds).unwrap();
        let b = CrossValidation::new(4).unwrap().with_seed(3).stratified_split(&ds).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn confusion_matrix_labels() {
        let ds = make_separable_data();
        let cv = CrossValidation::new(3).unwrap();
        let result = cv.evaluate(&DecisionTreeConfig::new(), &ds).unwrap();
        assert_eq!(result.confusion_matrix.n_labels(), 3);
        assert_eq!(result.confusion_matrix.as_rows().len(), 3);
    }

    #[test]
    fn invalid_fold_count() {
        assert!(CrossValidation::new(0).is_err());
        assert!(CrossValidation::new(1).is_err());
    }

    #[test]
    fn too_few_samples_for_folds() {
        let ds = Dataset::from_xy(
            vec![
                vec![Value::from(1.0)],
                vec![Value::from(2.0)],
                vec![Value::from(10.0)],
                vec![Value::from(11.0)],
                vec![Value::from(12.0)],
            ],
            vec![
                Value::from("a"),
                Value::from("a"),
                Value::from("b"),
                Value::from("b"),
                Value::from("b"),
            ],
        )
        .unwrap();
        let cv = CrossValidation::new(5).unwrap();
        let err = cv.evaluate(&DecisionTreeConfig::new(), &ds).unwrap_err();
        assert!(matches!(
            err,
            ForestError::TooFewSamplesForFolds { count: 2, n_folds: 5, .. }
        ));
    }

    #[test]
    fn empty_dataset_error() {
        let cv = CrossValidation::new(2).unwrap();
        let err = cv.evaluate(&DecisionTreeConfig::new(), &Dataset::default()).unwrap_err();
        assert!(matches!(err, ForestError::EmptyDataset));
    }
}
