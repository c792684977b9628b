//! Label tallies and size-weighted Gini impurity.

use std::collections::BTreeMap;
use std::fmt;

use crate::value::Value;

/// Size-weighted impurity value. Lower is better; 0 means pure.
#[derive(
    Debug, Clone, Copy, PartialEq, PartialOrd,
    serde::Serialize, serde::Deserialize,
)]
pub struct Impurity(f64);

impl Impurity {
    /// Create a new impurity value.
    pub(crate) fn new(value: f64) -> Self {
        Self(value)
    }

    /// Return the raw impurity value.
    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }
}

impl fmt::Display for Impurity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}", self.0)
    }
}

/// Occurrence count of each label in a set of rows.
///
/// Labels are kept in ascending [`Value`] order, so iteration and
/// [`LabelCounts::majority`] are deterministic.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LabelCounts {
    counts: BTreeMap<Value, usize>,
    total: usize,
}

impl LabelCounts {
    /// Create an empty tally.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Tally a sequence of labels.
    pub fn from_labels<'a>(labels: impl IntoIterator<Item = &'a Value>) -> Self {
        let mut counts = Self::new();
        for label in labels {
            counts.add(label);
        }
        counts
    }

    /// Record one more occurrence of `label`.
    pub fn add(&mut self, label: &Value) {
        if let Some(count) = self.counts.get_mut(label) {
            *count += 1;
        } else {
            self.counts.insert(label.clone(), 1);
        }
        self.total += 1;
    }

    /// Return the number of tallied rows.
    #[must_use]
    pub fn total(&self) -> usize {
        self.total
    }

    /// Return `true` when nothing has been tallied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Return the number of distinct labels.
    #[must_use]
    pub fn n_labels(&self) -> usize {
        self.counts.len()
    }

    /// Return the count for `label` (0 if absent).
    #[must_use]
    pub fn get(&self, label: &Value) -> usize {
        self.counts.get(label).copied().unwrap_or(0)
    }

    /// Iterate `(label, count)` pairs in ascending label order.
    pub fn iter(&self) -> impl Iterator<Item = (&Value, usize)> {
        self.counts.iter().map(|(label, &count)| (label, count))
    }

    /// Return `true` when exactly one distinct label is present.
    #[must_use]
    pub fn is_pure(&self) -> bool {
        self.counts.len() == 1
    }

    /// Return the most frequent label and its count.
    ///
    /// Labels are scanned in ascending order and the first one to reach the
    /// maximum wins, so ties resolve to the smallest label. `None` when empty.
    #[must_use]
    pub fn majority(&self) -> Option<(&Value, usize)> {
        let mut best: Option<(&Value, usize)> = None;
        for (label, &count) in &self.counts {
            if best.is_none_or(|(_, best_count)| count > best_count) {
                best = Some((label, count));
            }
        }
        best
    }

    /// Size-weighted Gini impurity: `N * Σ p(1 - p)`.
    ///
    /// Returns 0 for an empty or pure tally.
    #[must_use]
    pub fn gini(&self) -> Impurity {
        if self.total == 0 {
            return Impurity::new(0.0);
        }
        let n = self.total as f64;
        let sum: f64 = self
            .counts
            .values()
            .map(|&c| {
                let p = c as f64 / n;
                p * (1.0 - p)
            })
            .sum();
        Impurity::new(n * sum)
    }
}

impl fmt::Display for LabelCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (label, count)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{label}: {count}")?;
        }
        f.write_str("}")
    }
}

/// Combined impurity of a two-way partition.
#[must_use]
pub fn split_impurity(true_counts: &LabelCounts, false_counts: &LabelCounts) -> Impurity {
    Impurity::new(true_counts.gini().value() + false_counts.gini().value())
}

#[cfg(test)]
mod tests {
    use super::{Impurity, LabelCounts, split_impurity};
    use crate::value::Value;

    fn counts(labels: &[&str]) -> LabelCounts {
        let values: Vec<Value> = labels.iter().map(|&s| Value::from(s)).collect();
        LabelCounts::from_labels(&values)
    }

    #[test]
    fn tally() {
        let c = counts(&["yes", "no", "yes", "yes"]);
        assert_eq!(c.total(), 4);
        assert_eq!(c.n_labels(), 2);
        assert_eq!(c.get(&Value::from("yes")), 3);
        assert_eq!(c.get(&Value::from("no")), 1);
        assert_eq!(c.get(&Value::from("maybe")), 0);
    }

    #[test]
    fn gini_pure_is_zero() {
        assert!(counts(&["a", "a", "a"]).gini().value().abs() < f64::EPSILON);
    }

    #[test]
    fn gini_empty_is_zero() {
        assert!(LabelCounts::new().gini().value().abs() < f64::EPSILON);
    }

    #[test]
    fn gini_scaled_by_size() {
        // 4 * (0.5 * 0.5 + 0.5 * 0.5) = 2
        let small = counts(&["a", "b", "a", "b"]).gini().value();
        assert!((small - 2.0).abs() < 1e-12);
        // same ratio, twice the rows, twice the impurity
        let large = counts(&["a", "b", "a", "b", "a", "b", "a", "b"]).gini().value();
        assert!((large - 4.0).abs() < 1e-12);
    }

    #[test]
    fn gini_three_labels() {
        // 3 * 3 * (1/3 * 2/3) = 2
        let g = counts(&["a", "b", "c"]).gini().value();
        assert!((g - 2.0).abs() < 1e-12);
    }

    #[test]
    fn split_impurity_sums_sides() {
        let t = counts(&["a", "b"]);
        let f = counts(&["a", "a"]);
        let combined = split_impurity(&t, &f);
        assert!((combined.value() - 1.0).abs() < 1e-12);
        assert!((split_impurity(&f, &LabelCounts::new()).value()).abs() < 1e-12);
    }

    #[test]
    fn majority_picks_highest_count() {
        let c = counts(&["no", "yes", "yes"]);
        assert_eq!(c.majority(), Some((&Value::from("yes"), 2)));
    }

    #[test]
    fn majority_tie_goes_to_smallest_label() {
        let c = counts(&["zebra", "apple", "zebra", "apple"]);
        assert_eq!(c.majority(), Some((&Value::from("apple"), 2)));

        let numeric: Vec<Value> = vec![Value::from(2.0), Value::from(1.0)];
        let c = LabelCounts::from_labels(&numeric);
        assert_eq!(c.majority(), Some((&Value::from(1.0), 1)));
    }

    #[test]
    fn majority_of_empty_is_none() {
        assert_eq!(LabelCounts::new().majority(), None);
    }

    #[test]
    fn purity() {
        assert!(counts(&["x", "x"]).is_pure());
        assert!(!counts(&["x", "y"]).is_pure());
        assert!(!LabelCounts::new().is_pure());
    }

    #[test]
    fn display_sorted() {
        assert_eq!(counts(&["b", "a", "b"]).to_string(), "{a: 1, b: 2}");
    }

    #[test]
    fn impurity_display_and_order() {
        assert_eq!(format!("{}", Impurity::new(0.333333)), "0.333333");
        assert!(Impurity::new(0.1) < Impurity::new(0.5));
    }
}
