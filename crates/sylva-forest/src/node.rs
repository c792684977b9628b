use std::fmt;

use crate::impurity::{Impurity, LabelCounts};
use crate::split::SplitTest;
use crate::value::Value;

/// Zero-based feature column index.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    serde::Serialize, serde::Deserialize,
)]
pub struct FeatureIndex(usize);

impl FeatureIndex {
    /// Create a new feature index from a zero-based column position.
    #[must_use]
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    /// Return the zero-based feature column index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for FeatureIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Index into a `Vec<Node>` arena, identifying a specific node in a decision tree.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    serde::Serialize, serde::Deserialize,
)]
pub struct NodeIndex(usize);

impl NodeIndex {
    /// Index of the root node in every tree arena.
    pub const ROOT: NodeIndex = NodeIndex(0);

    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Return the zero-based arena index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Why the builder stopped growing at a leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum LeafKind {
    /// Built from zero rows; carries no label.
    Empty,
    /// The depth limit was reached.
    DepthLimit,
    /// Every row shares one label.
    Pure,
    /// No candidate split lowered the impurity.
    NoImprovingSplit,
}

/// A node in a decision tree arena.
///
/// Trees are stored as `Vec<Node>` where children are referenced by
/// [`NodeIndex`] rather than pointers. Every node owns its label tally;
/// split nodes keep theirs for inspection only.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum Node {
    /// An interior split node.
    Split {
        /// Test routing a row to `true_branch` or `false_branch`.
        test: SplitTest,
        /// Child for rows passing the test.
        true_branch: NodeIndex,
        /// Child for rows failing the test.
        false_branch: NodeIndex,
        /// Labels of the training rows that reached this node.
        counts: LabelCounts,
        /// Impurity of this node before splitting.
        impurity: Impurity,
        /// Combined impurity of the two children.
        split_impurity: Impurity,
    },
    /// A terminal leaf node.
    Leaf {
        /// Labels of the training rows that reached this leaf.
        counts: LabelCounts,
        /// Majority label, `None` only for [`LeafKind::Empty`].
        prediction: Option<Value>,
        /// Reason the builder stopped here.
        kind: LeafKind,
        /// Impurity at this leaf.
        impurity: Impurity,
    },
}

impl Node {
    /// Return the impurity at this node (before splitting for interior nodes).
    #[must_use]
    pub fn impurity(&self) -> Impurity {
        match self {
            Node::Split { impurity, .. } | Node::Leaf { impurity, .. } => *impurity,
        }
    }

    /// Return the label tally of the training rows that reached this node.
    #[must_use]
    pub fn counts(&self) -> &LabelCounts {
        match self {
            Node::Split { counts, .. } | Node::Leaf { counts, .. } => counts,
        }
    }

    /// Return the number of training samples that reached this node.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.counts().total()
    }

    /// Return `true` if this node is a leaf.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }

    /// Return the leaf's majority label; `None` for split nodes and empty leaves.
    #[must_use]
    pub fn prediction(&self) -> Option<&Value> {
        match self {
            Node::Leaf { prediction, .. } => prediction.as_ref(),
            Node::Split { .. } => None,
        }
    }
}
