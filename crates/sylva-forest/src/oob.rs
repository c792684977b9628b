//! Out-of-bag (OOB) evaluation for Random Forest.

use crate::dataset::Dataset;
use crate::error::ForestError;
use crate::impurity::LabelCounts;
use crate::tree::DecisionTree;

/// Out-of-bag evaluation result.
#[derive(Debug, Clone, PartialEq)]
pub struct OobScore {
    /// OOB accuracy (fraction of correctly predicted OOB samples).
    pub accuracy: f64,
    /// Number of samples that had at least one OOB tree.
    pub n_oob_samples: usize,
}

/// Compute out-of-bag predictions and accuracy.
///
/// For each sample, only trees that did not draw it vote. Samples with no
/// OOB tree are skipped; ties go to the smallest label.
pub(crate) fn compute_oob(
    trees: &[DecisionTree],
    dataset: &Dataset,
    oob_indices_per_tree: &[Vec<usize>],
) -> Result<OobScore, ForestError> {
    let mut oob_votes: Vec<LabelCounts> = vec![LabelCounts::new(); dataset.n_samples()];

    for (tree, oob_indices) in trees.iter().zip(oob_indices_per_tree) {
        for &sample_idx in oob_indices {
            let pred = tree.predict(dataset.row(sample_idx).features())?;
            oob_votes[sample_idx].add(&pred);
        }
    }

    let mut n_oob_samples = 0usize;
    let mut correct = 0usize;
    for (votes, row) in oob_votes.iter().zip(dataset.rows()) {
        let Some((predicted, _)) = votes.majority() else {
            continue;
        };
        n_oob_samples += 1;
        if predicted == row.label() {
            correct += 1;
        }
    }

    if n_oob_samples == 0 {
        return Err(ForestError::OobEvaluationFailed {
            reason: "no sample has any OOB tree".to_string(),
        });
    }

    Ok(OobScore {
        accuracy: correct as f64 / n_oob_samples as f64,
        n_oob_samples,
    })
}
