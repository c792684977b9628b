//! Tagged feature/label values.

use std::cmp::Ordering;
use std::fmt;

/// A single cell of a table: either a number or a category.
///
/// The variant is fixed when data is ingested, so split tests and tree
/// traversal dispatch on the tag instead of inspecting the value each time.
///
/// # Ordering
///
/// `Value` has a total order: every `Numeric` sorts before every
/// `Categorical`; numbers compare by [`f64::total_cmp`], categories
/// lexicographically. This order drives candidate enumeration in the
/// splitter and every majority-vote tie-break.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum Value {
    /// A real-valued feature or label.
    Numeric(f64),
    /// A string-valued feature or label.
    Categorical(String),
}

impl Value {
    /// Create a numeric value. `-0.0` is normalized to `0.0`.
    #[must_use]
    pub fn numeric(x: f64) -> Self {
        Value::Numeric(if x == 0.0 { 0.0 } else { x })
    }

    /// Create a categorical value.
    #[must_use]
    pub fn categorical(s: impl Into<String>) -> Self {
        Value::Categorical(s.into())
    }

    /// Return `true` for the `Numeric` variant.
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Numeric(_))
    }

    /// Return the number if this is a `Numeric` value.
    #[must_use]
    pub fn as_numeric(&self) -> Option<f64> {
        match self {
            Value::Numeric(x) => Some(*x),
            Value::Categorical(_) => None,
        }
    }

    /// Return the string if this is a `Categorical` value.
    #[must_use]
    pub fn as_categorical(&self) -> Option<&str> {
        match self {
            Value::Numeric(_) => None,
            Value::Categorical(s) => Some(s),
        }
    }

    /// Categorical values are always finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        match self {
            Value::Numeric(x) => x.is_finite(),
            Value::Categorical(_) => true,
        }
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Numeric(a), Value::Numeric(b)) => a.total_cmp(b),
            (Value::Numeric(_), Value::Categorical(_)) => Ordering::Less,
            (Value::Categorical(_), Value::Numeric(_)) => Ordering::Greater,
            (Value::Categorical(a), Value::Categorical(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Numeric(x) => write!(f, "{x}"),
            Value::Categorical(s) => f.write_str(s),
        }
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::numeric(x)
    }
}

impl From<i32> for Value {
    fn from(x: i32) -> Self {
        Value::numeric(f64::from(x))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Categorical(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Categorical(s)
    }
}
