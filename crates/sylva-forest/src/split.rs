use std::collections::BTreeSet;
use std::fmt;

use crate::dataset::Dataset;
use crate::impurity::{Impurity, LabelCounts, split_impurity};
use crate::node::FeatureIndex;
use crate::value::Value;

/// Minimum impurity reduction for a split to count as an improvement.
pub const IMPROVEMENT_TOLERANCE: f64 = 1e-10;

/// A binary test on one feature column.
///
/// Numeric test values act as thresholds (`row[feature] > value` is true);
/// categorical test values match by equality (`row[feature] == value` is
/// true). A row value of the other type always fails the test.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SplitTest {
    feature: FeatureIndex,
    value: Value,
}

impl SplitTest {
    /// Create a test on `feature` against the stored constant `value`.
    #[must_use]
    pub fn new(feature: FeatureIndex, value: Value) -> Self {
        Self { feature, value }
    }

    /// Return the tested feature column.
    #[must_use]
    pub fn feature(&self) -> FeatureIndex {
        self.feature
    }

    /// Return the stored threshold or category.
    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Evaluate the test against a full feature row.
    ///
    /// # Panics
    ///
    /// Panics if `sample` is shorter than the tested feature index.
    #[must_use]
    pub fn matches(&self, sample: &[Value]) -> bool {
        passes(&self.value, &sample[self.feature.index()])
    }
}

impl fmt::Display for SplitTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Value::Numeric(_) => write!(f, "x[{}] > {}", self.feature, self.value),
            Value::Categorical(_) => write!(f, "x[{}] == {}", self.feature, self.value),
        }
    }
}

fn passes(test_value: &Value, observed: &Value) -> bool {
    match (test_value, observed) {
        (Value::Numeric(threshold), Value::Numeric(x)) => x > threshold,
        (Value::Categorical(category), Value::Categorical(s)) => s == category,
        _ => false,
    }
}

/// Result of finding the best split for a node.
#[derive(Debug, Clone)]
pub struct SplitResult {
    /// Winning test.
    pub test: SplitTest,
    /// Combined impurity of the two sides.
    pub impurity: Impurity,
    /// Sample indices passing the test.
    pub true_indices: Vec<usize>,
    /// Sample indices failing the test.
    pub false_indices: Vec<usize>,
    /// Label tally of the true side.
    pub true_counts: LabelCounts,
    /// Label tally of the false side.
    pub false_counts: LabelCounts,
}

/// Split `sample_indices` into `(true_indices, false_indices)` by `test`.
///
/// Every input index lands in exactly one side; relative order is preserved.
#[must_use]
pub fn partition(
    dataset: &Dataset,
    sample_indices: &[usize],
    test: &SplitTest,
) -> (Vec<usize>, Vec<usize>) {
    sample_indices
        .iter()
        .partition(|&&si| test.matches(dataset.row(si).features()))
}

/// Search every feature and every distinct observed value for the split
/// with the lowest combined impurity.
///
/// Features are visited in column order and candidate values in ascending
/// [`Value`] order; on equal impurity the first candidate found is kept.
/// Candidates leaving one side empty are skipped.
///
/// Returns `None` when no candidate produces two non-empty sides, or when
/// the best candidate does not lower `parent_impurity` by at least
/// [`IMPROVEMENT_TOLERANCE`].
#[must_use]
pub fn find_best_split(
    dataset: &Dataset,
    sample_indices: &[usize],
    parent_impurity: Impurity,
) -> Option<SplitResult> {
    if sample_indices.is_empty() || dataset.n_features() == 0 {
        return None;
    }

    let mut best: Option<(FeatureIndex, &Value, Impurity)> = None;

    for feat_idx in 0..dataset.n_features() {
        let feature = FeatureIndex::new(feat_idx);
        let candidates: BTreeSet<&Value> = sample_indices
            .iter()
            .map(|&si| dataset.row(si).feature(feature))
            .collect();

        for candidate in candidates {
            let mut true_counts = LabelCounts::new();
            let mut false_counts = LabelCounts::new();
            for &si in sample_indices {
                let row = dataset.row(si);
                if passes(candidate, row.feature(feature)) {
                    true_counts.add(row.label());
                } else {
                    false_counts.add(row.label());
                }
            }
            if true_counts.is_empty() || false_counts.is_empty() {
                continue;
            }

            let combined = split_impurity(&true_counts, &false_counts);
            if best.is_none_or(|(_, _, best_impurity)| combined < best_impurity) {
                best = Some((feature, candidate, combined));
            }
        }
    }

    let (feature, value, impurity) = best?;
    if parent_impurity.value() - impurity.value() < IMPROVEMENT_TOLERANCE {
        return None;
    }

    let test = SplitTest::new(feature, value.clone());
    let (true_indices, false_indices) = partition(dataset, sample_indices, &test);
    let true_counts = LabelCounts::from_labels(true_indices.iter().map(|&si| dataset.row(si).label()));
    let false_counts =
        LabelCounts::from_labels(false_indices.iter().map(|&si| dataset.row(si).label()));

    Some(SplitResult {
        test,
        impurity,
        true_indices,
        false_indices,
        true_counts,
        false_counts,
    })
}
