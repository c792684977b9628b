//! Confusion matrix and per-label classification metrics.

use std::collections::BTreeSet;
use std::fmt;

use crate::error::ForestError;
use crate::value::Value;

/// A confusion matrix for multi-label classification.
///
/// Rows and columns follow [`ConfusionMatrix::labels`], the sorted union of
/// true and predicted labels. Entry `matrix[t][p]` counts samples whose true
/// label is `labels[t]` and whose prediction is `labels[p]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfusionMatrix {
    labels: Vec<Value>,
    matrix: Vec<Vec<usize>>,
}

/// Per-label precision, recall, and F1 score.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassMetrics {
    /// The label these metrics describe.
    pub label: Value,
    /// Precision: TP / (TP + FP). 0.0 if nothing was predicted as this label.
    pub precision: f64,
    /// Recall: TP / (TP + FN). 0.0 if no true samples carry this label.
    pub recall: f64,
    /// F1: 2 * precision * recall / (precision + recall). 0.0 if both are zero.
    pub f1: f64,
    /// Number of true samples with this label.
    pub support: usize,
}

impl ConfusionMatrix {
    /// Build a confusion matrix from true and predicted labels.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::EmptyDataset`] | Zero labels provided |
    /// | [`ForestError::LabelCountMismatch`] | The two sequences differ in length |
    pub fn from_labels(true_labels: &[Value], predicted: &[Value]) -> Result<Self, ForestError> {
        if true_labels.is_empty() {
            return Err(ForestError::EmptyDataset);
        }
        if true_labels.len() != predicted.len() {
            return Err(ForestError::LabelCountMismatch {
                n_samples: true_labels.len(),
                n_labels: predicted.len(),
            });
        }

        let labels: Vec<Value> = true_labels
            .iter()
            .chain(predicted)
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let position = |label: &Value| labels.binary_search(label).unwrap_or_default();

        let mut matrix = vec![vec![0usize; labels.len()]; labels.len()];
        for (t, p) in true_labels.iter().zip(predicted) {
            matrix[position(t)][position(p)] += 1;
        }
        Ok(Self { labels, matrix })
    }

    /// Overall accuracy: proportion of correct predictions.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        let correct: usize = (0..self.n_labels()).map(|i| self.matrix[i][i]).sum();
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            correct as f64 / total as f64
        }
    }

    /// Per-label precision, recall, F1, and support, in label order.
    #[must_use]
    pub fn class_metrics(&self) -> Vec<ClassMetrics> {
        let n = self.n_labels();
        (0..n)
            .map(|c| {
                let tp = self.matrix[c][c];
                let fp: usize = (0..n).filter(|&i| i != c).map(|i| self.matrix[i][c]).sum();
                let fn_: usize = (0..n).filter(|&j| j != c).map(|j| self.matrix[c][j]).sum();
                let support = tp + fn_;
                let precision = if tp + fp == 0 {
                    0.0
                } else {
                    tp as f64 / (tp + fp) as f64
                };
                let recall = if support == 0 {
                    0.0
                } else {
                    tp as f64 / support as f64
                };
                let f1 = if precision + recall == 0.0 {
                    0.0
                } else {
                    2.0 * precision * recall / (precision + recall)
                };
                ClassMetrics {
                    label: self.labels[c].clone(),
                    precision,
                    recall,
                    f1,
                    support,
                }
            })
            .collect()
    }

    /// Return the row/column labels in ascending order.
    #[must_use]
    pub fn labels(&self) -> &[Value] {
        &self.labels
    }

    /// Return the underlying matrix rows.
    #[must_use]
    pub fn as_rows(&self) -> &[Vec<usize>] {
        &self.matrix
    }

    /// Return the number of distinct labels.
    #[must_use]
    pub fn n_labels(&self) -> usize {
        self.labels.len()
    }

    /// Return the number of counted samples.
    #[must_use]
    pub fn total(&self) -> usize {
        self.matrix.iter().flatten().sum()
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.labels.iter().map(ToString::to_string).collect();
        let width = names.iter().map(String::len).max().unwrap_or(0).max(6);

        write!(f, "{:>width$}", "true\\pred")?;
        for name in &names {
            write!(f, " {name:>width$}")?;
        }
        writeln!(f)?;

        for (name, row) in names.iter().zip(&self.matrix) {
            write!(f, "{name:>width$}")?;
            for val in row {
                write!(f, " {val:>width$}")?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}
