use std::collections::VecDeque;
use std::fmt;

use tracing::{debug, instrument, trace};

use crate::{
    ForestError,
    dataset::Dataset,
    impurity::LabelCounts,
    node::{LeafKind, Node, NodeIndex},
    split::find_best_split,
    value::Value,
};

/// Configuration for a single decision tree.
///
/// Construct via [`DecisionTreeConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter   | Default            |
/// |-------------|--------------------|
/// | `max_depth` | `None` (unlimited) |
#[derive(Debug, Clone, Default)]
pub struct DecisionTreeConfig {
    pub(crate) max_depth: Option<usize>,
}

impl DecisionTreeConfig {
    /// Create a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self { max_depth: None }
    }

    /// Set the maximum tree depth.
    ///
    /// `None` grows until every leaf is pure or no split improves impurity.
    /// `Some(d)` allows at most `d` levels of split nodes (root is depth 0),
    /// so `Some(0)` always yields a single leaf.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Return the maximum depth limit, if any.
    #[must_use]
    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// Grow a tree on a validated dataset.
    ///
    /// An empty dataset produces a single [`LeafKind::Empty`] leaf; every
    /// prediction through it fails with [`ForestError::NoMajorityLabel`].
    #[instrument(skip_all, fields(n_samples = dataset.n_samples(), max_depth = ?self.max_depth))]
    pub fn fit(&self, dataset: &Dataset) -> DecisionTree {
        let sample_indices: Vec<usize> = (0..dataset.n_samples()).collect();
        let mut arena: Vec<Node> = Vec::new();

        build_node(dataset, &sample_indices, self.max_depth, 0, &mut arena);

        debug!(
            n_nodes = arena.len(),
            n_features = dataset.n_features(),
            "decision tree built"
        );

        DecisionTree {
            nodes: arena,
            n_features: dataset.n_features(),
        }
    }

    /// Grow a tree on rows whose last column is the label.
    ///
    /// # Errors
    ///
    /// Any validation error from [`Dataset::from_table`].
    pub fn fit_table(&self, table: Vec<Vec<Value>>) -> Result<DecisionTree, ForestError> {
        Ok(self.fit(&Dataset::from_table(table)?))
    }

    /// Grow a tree on a feature table and a parallel label sequence.
    ///
    /// # Errors
    ///
    /// Any validation error from [`Dataset::from_xy`].
    pub fn fit_xy(
        &self,
        features: Vec<Vec<Value>>,
        labels: Vec<Value>,
    ) -> Result<DecisionTree, ForestError> {
        Ok(self.fit(&Dataset::from_xy(features, labels)?))
    }
}

fn push_leaf(arena: &mut Vec<Node>, counts: LabelCounts, kind: LeafKind) -> NodeIndex {
    let prediction = counts.majority().map(|(label, _)| label.clone());
    let idx = arena.len();
    arena.push(Node::Leaf {
        prediction,
        impurity: counts.gini(),
        counts,
        kind,
    });
    NodeIndex::new(idx)
}

/// Recursively build the arena-based decision tree.
///
/// Returns the [`NodeIndex`] of the node just created in `arena`.
fn build_node(
    dataset: &Dataset,
    sample_indices: &[usize],
    max_depth: Option<usize>,
    depth: usize,
    arena: &mut Vec<Node>,
) -> NodeIndex {
    let counts = LabelCounts::from_labels(sample_indices.iter().map(|&si| dataset.row(si).label()));

    if counts.is_empty() {
        return push_leaf(arena, counts, LeafKind::Empty);
    }
    if max_depth == Some(depth) {
        return push_leaf(arena, counts, LeafKind::DepthLimit);
    }
    if counts.is_pure() {
        return push_leaf(arena, counts, LeafKind::Pure);
    }

    let impurity = counts.gini();
    let Some(split) = find_best_split(dataset, sample_indices, impurity) else {
        return push_leaf(arena, counts, LeafKind::NoImprovingSplit);
    };

    trace!(
        depth,
        test = %split.test,
        parent = %impurity,
        combined = %split.impurity,
        n_true = split.true_indices.len(),
        n_false = split.false_indices.len(),
        "split chosen"
    );

    // Reserve the parent's slot so it precedes its subtrees, then overwrite.
    let node_idx = arena.len();
    arena.push(Node::Leaf {
        prediction: None,
        counts: LabelCounts::new(),
        kind: LeafKind::Empty,
        impurity,
    });

    let false_branch = build_node(dataset, &split.false_indices, max_depth, depth + 1, arena);
    let true_branch = build_node(dataset, &split.true_indices, max_depth, depth + 1, arena);

    arena[node_idx] = Node::Split {
        test: split.test,
        true_branch,
        false_branch,
        counts,
        impurity,
        split_impurity: split.impurity,
    };

    NodeIndex::new(node_idx)
}

/// A fitted decision tree.
///
/// Stored as an arena-based `Vec<Node>` with index references; the root is
/// [`NodeIndex::ROOT`].
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DecisionTree {
    pub(crate) nodes: Vec<Node>,
    pub(crate) n_features: usize,
}

impl DecisionTree {
    /// Predict the label for a single sample.
    ///
    /// # Errors
    ///
    /// | Variant                                    | When                                  |
    /// |--------------------------------------------|---------------------------------------|
    /// | [`ForestError::PredictionFeatureMismatch`] | `sample.len() != n_features`          |
    /// | [`ForestError::NoMajorityLabel`]           | the tree was grown on an empty dataset |
    pub fn predict(&self, sample: &[Value]) -> Result<Value, ForestError> {
        self.leaf_for(sample)?
            .prediction()
            .cloned()
            .ok_or(ForestError::NoMajorityLabel)
    }

    /// Predict labels for many samples, preserving input order.
    ///
    /// # Errors
    ///
    /// The first error from [`DecisionTree::predict`].
    pub fn predict_batch(&self, samples: &[Vec<Value>]) -> Result<Vec<Value>, ForestError> {
        samples.iter().map(|sample| self.predict(sample)).collect()
    }

    /// Return the leaf a sample lands in.
    ///
    /// An empty-trained tree has no feature columns to check, so any sample
    /// reaches its single leaf.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::PredictionFeatureMismatch`] when
    /// `sample.len() != n_features`.
    pub fn leaf_for(&self, sample: &[Value]) -> Result<&Node, ForestError> {
        if self.n_features > 0 && sample.len() != self.n_features {
            return Err(ForestError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: sample.len(),
            });
        }
        Ok(&self.nodes[self.traverse(sample)])
    }

    /// Return the root node.
    #[must_use]
    pub fn root(&self) -> &Node {
        &self.nodes[NodeIndex::ROOT.index()]
    }

    /// Return the node at `index`, if it exists.
    #[must_use]
    pub fn node(&self, index: NodeIndex) -> Option<&Node> {
        self.nodes.get(index.index())
    }

    /// Return every node in arena order (parents before their children).
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Return the number of features this tree was trained on.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Return the total number of nodes in the tree (both splits and leaves).
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Return the number of leaf nodes.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Return the number of split nodes on the longest root-to-leaf path.
    ///
    /// A single-node tree (just a root leaf) has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        let mut max_depth = 0usize;
        let mut queue = VecDeque::new();
        queue.push_back((NodeIndex::ROOT, 0usize));

        while let Some((idx, d)) = queue.pop_front() {
            match &self.nodes[idx.index()] {
                Node::Leaf { .. } => max_depth = max_depth.max(d),
                Node::Split {
                    true_branch,
                    false_branch,
                    ..
                } => {
                    queue.push_back((*true_branch, d + 1));
                    queue.push_back((*false_branch, d + 1));
                }
            }
        }

        max_depth
    }

    /// Traverse the tree from the root and return the arena index of the leaf.
    fn traverse(&self, sample: &[Value]) -> usize {
        let mut idx = NodeIndex::ROOT.index();
        loop {
            match &self.nodes[idx] {
                Node::Leaf { .. } => return idx,
                Node::Split {
                    test,
                    true_branch,
                    false_branch,
                    ..
                } => {
                    idx = if test.matches(sample) {
                        true_branch.index()
                    } else {
                        false_branch.index()
                    };
                }
            }
        }
    }

    fn fmt_node(&self, f: &mut fmt::Formatter<'_>, idx: NodeIndex, indent: &str) -> fmt::Result {
        match &self.nodes[idx.index()] {
            Node::Leaf { counts, .. } => writeln!(f, "{counts}"),
            Node::Split {
                test,
                true_branch,
                false_branch,
                ..
            } => {
                writeln!(f, "{test}?")?;
                let child_indent = format!("{indent}  ");
                write!(f, "{indent}true -> ")?;
                self.fmt_node(f, *true_branch, &child_indent)?;
                write!(f, "{indent}false -> ")?;
                self.fmt_node(f, *false_branch, &child_indent)
            }
        }
    }
}

impl fmt::Display for DecisionTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_node(f, NodeIndex::ROOT, "")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::split::SplitTest;

    fn v(x: f64) -> Value {
        Value::from(x)
    }

    fn s(x: &str) -> Value {
        Value::from(x)
    }

    /// The referrer/country/read-FAQ/pages-viewed table with service tier labels.
    fn subscriptions() -> Vec<Vec<Value>> {
        let raw: [(&str, &str, &str, f64, &str); 16] = [
            ("slashdot", "USA", "yes", 18.0, "None"),
            ("google", "France", "yes", 23.0, "Premium"),
            ("reddit", "USA", "yes", 24.0, "Basic"),
            ("kiwitobes", "France", "yes", 23.0, "Basic"),
            ("google", "UK", "no", 21.0, "Premium"),
            ("(direct)", "New Zealand", "no", 12.0, "None"),
            ("(direct)", "UK", "no", 21.0, "Basic"),
            ("google", "USA", "no", 24.0, "Premium"),
            ("slashdot", "France", "yes", 19.0, "None"),
            ("reddit", "USA", "no", 18.0, "None"),
            ("google", "UK", "no", 18.0, "None"),
            ("kiwitobes", "UK", "no", 19.0, "None"),
            ("reddit", "New Zealand", "yes", 12.0, "Basic"),
            ("slashdot", "UK", "no", 21.0, "None"),
            ("google", "UK", "yes", 18.0, "Basic"),
            ("kiwitobes", "France", "yes", 19.0, "Basic"),
        ];
        raw.iter()
            .map(|&(referrer, country, faq, pages, tier)| {
                vec![s(referrer), s(country), s(faq), v(pages), s(tier)]
            })
            .collect()
    }

    /// Longest root-to-leaf path, counted in split nodes, by explicit recursion.
    fn split_depth(tree: &DecisionTree, idx: NodeIndex) -> usize {
        match tree.node(idx).unwrap() {
            Node::Leaf { .. } => 0,
            Node::Split {
                true_branch,
                false_branch,
                ..
            } => 1 + split_depth(tree, *true_branch).max(split_depth(tree, *false_branch)),
        }
    }

    #[test]
    fn two_value_scenario() {
        let tree = DecisionTreeConfig::new()
            .with_max_depth(Some(10))
            .fit_table(vec![
                vec![v(1.0), s("A")],
                vec![v(1.0), s("A")],
                vec![v(2.0), s("B")],
                vec![v(2.0), s("B")],
            ])
            .unwrap();

        match tree.root() {
            Node::Split {
                test,
                true_branch,
                false_branch,
                ..
            } => {
                assert_eq!(test, &SplitTest::new(crate::FeatureIndex::new(0), v(1.0)));
                let t = tree.node(*true_branch).unwrap();
                let f = tree.node(*false_branch).unwrap();
                assert_eq!(t.prediction(), Some(&s("B")));
                assert_eq!(f.prediction(), Some(&s("A")));
                assert!(matches!(t, Node::Leaf { kind: LeafKind::Pure, .. }));
                assert!(matches!(f, Node::Leaf { kind: LeafKind::Pure, .. }));
            }
            Node::Leaf { .. } => panic!("root should split"),
        }
        assert_eq!(tree.n_leaves(), 2);
        assert_eq!(tree.predict(&[v(1.0)]).unwrap(), s("A"));
        assert_eq!(tree.predict(&[v(2.0)]).unwrap(), s("B"));
    }

    #[test]
    fn single_row_is_single_leaf() {
        let tree = DecisionTreeConfig::new().fit_table(vec![vec![v(5.0), s("X")]]).unwrap();
        assert_eq!(tree.n_nodes(), 1);
        assert_eq!(tree.predict(&[v(5.0)]).unwrap(), s("X"));
        assert_eq!(tree.predict(&[v(-100.0)]).unwrap(), s("X"));
    }

    #[test]
    fn pure_dataset_single_leaf() {
        let tree = DecisionTreeConfig::new()
            .fit_table(vec![
                vec![v(1.0), v(2.0), s("same")],
                vec![v(3.0), v(4.0), s("same")],
                vec![v(5.0), v(6.0), s("same")],
            ])
            .unwrap();
        assert_eq!(tree.n_nodes(), 1);
        assert!(matches!(tree.root(), Node::Leaf { kind: LeafKind::Pure, .. }));
        assert_eq!(tree.predict(&[v(2.0), v(3.0)]).unwrap(), s("same"));
    }

    #[test]
    fn empty_dataset_is_degenerate_leaf() {
        let tree = DecisionTreeConfig::new().fit(&Dataset::default());
        assert_eq!(tree.n_nodes(), 1);
        assert!(tree.root().counts().is_empty());
        assert!(matches!(tree.root(), Node::Leaf { kind: LeafKind::Empty, .. }));
        let err = tree.predict(&[v(1.0)]).unwrap_err();
        assert!(matches!(err, ForestError::NoMajorityLabel));
    }

    #[test]
    fn zero_depth_is_majority_leaf() {
        let tree = DecisionTreeConfig::new()
            .with_max_depth(Some(0))
            .fit_table(vec![
                vec![v(1.0), s("A")],
                vec![v(2.0), s("B")],
                vec![v(3.0), s("B")],
            ])
            .unwrap();
        assert_eq!(tree.n_nodes(), 1);
        assert!(matches!(tree.root(), Node::Leaf { kind: LeafKind::DepthLimit, .. }));
        assert_eq!(tree.predict(&[v(1.0)]).unwrap(), s("B"));
    }

    #[test]
    fn depth_limit_tie_goes_to_smallest_label() {
        let tree = DecisionTreeConfig::new()
            .with_max_depth(Some(0))
            .fit_table(vec![vec![v(1.0), s("B")], vec![v(2.0), s("A")]])
            .unwrap();
        assert_eq!(tree.predict(&[v(9.0)]).unwrap(), s("A"));
    }

    #[test]
    fn plateau_becomes_leaf() {
        let tree = DecisionTreeConfig::new()
            .fit_table(vec![
                vec![v(1.0), s("A")],
                vec![v(1.0), s("B")],
                vec![v(1.0), s("B")],
            ])
            .unwrap();
        assert_eq!(tree.n_nodes(), 1);
        assert!(matches!(
            tree.root(),
            Node::Leaf { kind: LeafKind::NoImprovingSplit, .. }
        ));
        assert_eq!(tree.predict(&[v(1.0)]).unwrap(), s("B"));
    }

    #[test]
    fn xor_needs_depth_two() {
        let table = vec![
            vec![v(0.0), v(0.0), s("even")],
            vec![v(0.0), v(1.0), s("odd")],
            vec![v(1.0), v(0.0), s("odd")],
            vec![v(1.0), v(1.0), s("even")],
        ];
        // No single split improves XOR, so an unbounded tree stops at the root.
        let tree = DecisionTreeConfig::new().fit_table(table).unwrap();
        assert_eq!(tree.depth(), 0);
    }

    #[test]
    fn subscriptions_are_memorized() {
        let table = subscriptions();
        let tree = DecisionTreeConfig::new().fit_table(table.clone()).unwrap();
        for row in &table {
            let (features, label) = row.split_at(row.len() - 1);
            assert_eq!(&tree.predict(features).unwrap(), &label[0]);
        }
    }

    #[test]
    fn depth_bound_holds() {
        for k in 0..4 {
            let tree = DecisionTreeConfig::new()
                .with_max_depth(Some(k))
                .fit_table(subscriptions())
                .unwrap();
            assert!(tree.depth() <= k, "k = {k}, depth = {}", tree.depth());
            assert_eq!(tree.depth(), split_depth(&tree, NodeIndex::ROOT));
        }
    }

    #[test]
    fn split_impurity_never_exceeds_parent() {
        let tree = DecisionTreeConfig::new().fit_table(subscriptions()).unwrap();
        let mut n_splits = 0;
        for node in tree.nodes() {
            if let Node::Split {
                impurity,
                split_impurity,
                true_branch,
                false_branch,
                counts,
                ..
            } = node
            {
                n_splits += 1;
                assert!(split_impurity.value() <= impurity.value());
                let t = tree.node(*true_branch).unwrap().n_samples();
                let f = tree.node(*false_branch).unwrap().n_samples();
                assert!(t > 0 && f > 0);
                assert_eq!(t + f, counts.total());
            }
        }
        assert!(n_splits > 0);
    }

    #[test]
    fn unseen_values_still_resolve() {
        let tree = DecisionTreeConfig::new().fit_table(subscriptions()).unwrap();
        let label = tree
            .predict(&[s("bing"), s("Canada"), s("maybe"), v(99.0)])
            .unwrap();
        assert!(["None", "Basic", "Premium"].contains(&label.as_categorical().unwrap()));
    }

    #[test]
    fn prediction_feature_mismatch() {
        let tree = DecisionTreeConfig::new()
            .fit_table(vec![vec![v(1.0), v(2.0), s("A")], vec![v(3.0), v(4.0), s("B")]])
            .unwrap();
        let err = tree.predict(&[v(1.0)]).unwrap_err();
        assert!(matches!(
            err,
            ForestError::PredictionFeatureMismatch { expected: 2, got: 1 }
        ));
    }

    #[test]
    fn fit_xy_matches_fit_table() {
        let table = subscriptions();
        let features: Vec<Vec<Value>> = table.iter().map(|r| r[..4].to_vec()).collect();
        let labels: Vec<Value> = table.iter().map(|r| r[4].clone()).collect();
        let a = DecisionTreeConfig::new().fit_table(table).unwrap();
        let b = DecisionTreeConfig::new().fit_xy(features.clone(), labels).unwrap();
        assert_eq!(a.predict_batch(&features).unwrap(), b.predict_batch(&features).unwrap());
        assert_eq!(a.to_string(), b.to_string());
    }

    #[test]
    fn display_renders_branches() {
        let tree = DecisionTreeConfig::new()
            .fit_table(vec![
                vec![v(1.0), s("A")],
                vec![v(1.0), s("A")],
                vec![v(2.0), s("B")],
            ])
            .unwrap();
        assert_eq!(tree.to_string(), "x[0] > 1?\ntrue -> {B: 1}\nfalse -> {A: 2}\n");
    }
}
