//! Random Forest training over bootstrap samples.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, instrument};

use crate::config::{OobMode, RandomForestConfig, SamplingMode};
use crate::dataset::Dataset;
use crate::error::ForestError;
use crate::impurity::LabelCounts;
use crate::oob::compute_oob;
use crate::result::{RandomForestResult, TrainingMetadata};
use crate::schema::TableSchema;
use crate::tree::{DecisionTree, DecisionTreeConfig};

/// A fitted Random Forest ensemble.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RandomForest {
    pub(crate) trees: Vec<DecisionTree>,
    pub(crate) n_features: usize,
    pub(crate) schema: Option<TableSchema>,
}

impl RandomForest {
    /// Borrow the member trees in build order.
    #[must_use]
    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }
}

/// Generate a bootstrap sample and the out-of-bag indices.
fn bootstrap_sample(
    n_samples: usize,
    draw_count: usize,
    rng: &mut impl Rng,
) -> (Vec<usize>, Vec<usize>) {
    let mut in_bag = vec![false; n_samples];
    let mut bootstrap_indices = Vec::with_capacity(draw_count);
    for _ in 0..draw_count {
        let idx = rng.gen_range(0..n_samples);
        bootstrap_indices.push(idx);
        in_bag[idx] = true;
    }
    let oob_indices: Vec<usize> = (0..n_samples).filter(|&i| !in_bag[i]).collect();
    (bootstrap_indices, oob_indices)
}

/// Number of rows each tree draws: `floor(fraction * n_samples)`.
fn draw_count(n_samples: usize, fraction: f64) -> Result<usize, ForestError> {
    if !(fraction > 0.0 && fraction <= 1.0) {
        return Err(ForestError::InvalidBootstrapFraction { fraction });
    }
    let count = ((n_samples as f64) * fraction).floor() as usize;
    if count == 0 {
        return Err(ForestError::EmptyBootstrapSample {
            n_samples,
            fraction,
        });
    }
    Ok(count)
}

/// Train the Random Forest ensemble.
#[instrument(skip_all, fields(n_trees = config.n_trees, n_samples = dataset.n_samples()))]
pub(crate) fn train(
    config: &RandomForestConfig,
    dataset: &Dataset,
) -> Result<RandomForestResult, ForestError> {
    if dataset.is_empty() {
        return Err(ForestError::EmptyDataset);
    }
    let n_samples = dataset.n_samples();
    let n_features = dataset.n_features();
    let n_labels = LabelCounts::from_labels(dataset.labels()).n_labels();

    let draw_count = match config.sampling {
        SamplingMode::Bootstrap => draw_count(n_samples, config.bootstrap_fraction)?,
        SamplingMode::Disabled => n_samples,
    };

    info!(
        n_trees = config.n_trees,
        n_samples,
        n_features,
        n_labels,
        draw_count,
        "training random forest"
    );

    // Per-tree seeds from the master stream; each tree samples independently.
    let mut master_rng = ChaCha8Rng::seed_from_u64(config.seed);
    let tree_seeds: Vec<u64> = (0..config.n_trees).map(|_| master_rng.r#gen()).collect();

    let tree_config = DecisionTreeConfig::new().with_max_depth(config.max_depth);
    let mut trees = Vec::with_capacity(config.n_trees);
    let mut oob_indices_per_tree = Vec::with_capacity(config.n_trees);

    for (tree_idx, seed) in tree_seeds.into_iter().enumerate() {
        let (tree, oob_indices) = match config.sampling {
            SamplingMode::Bootstrap => {
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                let (bootstrap_indices, oob_indices) =
                    bootstrap_sample(n_samples, draw_count, &mut rng);
                (tree_config.fit(&dataset.subset(&bootstrap_indices)), oob_indices)
            }
            SamplingMode::Disabled => (tree_config.fit(dataset), Vec::new()),
        };
        debug!(
            tree_idx,
            n_nodes = tree.n_nodes(),
            depth = tree.depth(),
            n_oob = oob_indices.len(),
            "tree built"
        );
        trees.push(tree);
        oob_indices_per_tree.push(oob_indices);
    }

    let oob_score = if config.oob_mode == OobMode::Enabled {
        Some(compute_oob(&trees, dataset, &oob_indices_per_tree)?)
    } else {
        None
    };

    let forest = RandomForest {
        trees,
        n_features,
        schema: dataset.schema().cloned(),
    };

    let metadata = TrainingMetadata {
        n_trees: config.n_trees,
        n_features,
        n_labels,
        n_samples,
        draw_count,
    };

    info!(
        oob_accuracy = oob_score.as_ref().map(|s| s.accuracy),
        "random forest training complete"
    );

    Ok(RandomForestResult::new(forest, oob_score, oob_indices_per_tree, metadata))
}
