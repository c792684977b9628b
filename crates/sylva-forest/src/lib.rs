//! Gini decision trees and bootstrap-aggregated forests over mixed-type tables.
//!
//! Rows mix numeric and categorical [`Value`]s; the label is a [`Value`] too.
//! Trees split on `x > threshold` for numeric columns and `x == category`
//! for categorical ones, choosing the candidate with the lowest
//! size-weighted Gini impurity. Forests train one tree per bootstrap sample
//! and predict by majority vote with a confidence score.

mod config;
mod confusion;
mod dataset;
mod error;
mod eval;
mod forest;
mod impurity;
mod learner;
mod node;
mod oob;
mod predict;
mod result;
mod schema;
mod serialize;
mod split;
mod tree;
mod value;

pub use config::{OobMode, RandomForestConfig, SamplingMode};
pub use confusion::{ClassMetrics, ConfusionMatrix};
pub use dataset::{Dataset, Row};
pub use error::{ErrorKind, ForestError};
pub use eval::{CrossValidation, CrossValidationResult, accuracy};
pub use forest::RandomForest;
pub use impurity::{Impurity, LabelCounts, split_impurity};
pub use learner::{Classifier, Learner};
pub use node::{FeatureIndex, LeafKind, Node, NodeIndex};
pub use oob::OobScore;
pub use predict::{ForestPrediction, Vote};
pub use result::{RandomForestResult, TrainingMetadata};
pub use schema::{ColumnKind, TableSchema};
pub use serialize::FORMAT_VERSION;
pub use split::{IMPROVEMENT_TOLERANCE, SplitResult, SplitTest, find_best_split, partition};
pub use tree::{DecisionTree, DecisionTreeConfig};
pub use value::Value;
