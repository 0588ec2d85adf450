//! First-match-wins condition tables.

use serde::de::Error as _;
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Expression of the unconditional default row.
pub const DEFAULT_EXPRESSION: &str = "true";

/// Ordered `(expression, result)` rows followed by an unconditional default.
///
/// The renderer evaluates rows top to bottom and takes the first match, so
/// row order is preserved exactly as pushed. The default row is stored
/// separately and always serialized last as `["true", default]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionTable {
    rows: Vec<(String, String)>,
    default: String,
}

impl ConditionTable {
    /// Create a table containing only the default row.
    pub fn new(default: impl Into<String>) -> Self {
        Self {
            rows: Vec::new(),
            default: default.into(),
        }
    }

    pub fn with_rows<I, E, R>(rows: I, default: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = (E, R)>,
        E: Into<String>,
        R: Into<String>,
    {
        Self {
            rows: rows
                .into_iter()
                .map(|(expr, result)| (expr.into(), result.into()))
                .collect(),
            default: default.into(),
        }
    }

    /// Append a conditional row before the default.
    pub fn push(&mut self, expression: impl Into<String>, result: impl Into<String>) {
        self.rows.push((expression.into(), result.into()));
    }

    /// Conditional rows, excluding the default.
    #[must_use]
    pub fn rows(&self) -> &[(String, String)] {
        &self.rows
    }

    #[must_use]
    pub fn default_result(&self) -> &str {
        &self.default
    }

    /// Number of rows including the default.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len() + 1
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// All rows in evaluation order, default last.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.rows
            .iter()
            .map(|(expr, result)| (expr.as_str(), result.as_str()))
            .chain(std::iter::once((DEFAULT_EXPRESSION, self.default.as_str())))
    }

    /// Rewrite every result, default included, preserving order.
    #[must_use]
    pub fn map_results<F>(&self, mut f: F) -> Self
    where
        F: FnMut(&str) -> String,
    {
        Self {
            rows: self
                .rows
                .iter()
                .map(|(expr, result)| (expr.clone(), f(result)))
                .collect(),
            default: f(&self.default),
        }
    }
}

impl Serialize for ConditionTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.len()))?;
        for entry in self.entries() {
            seq.serialize_element(&[entry.0, entry.1])?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for ConditionTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut rows = Vec::<(String, String)>::deserialize(deserializer)?;
        match rows.pop() {
            Some((expr, default)) if expr == DEFAULT_EXPRESSION => Ok(Self { rows, default }),
            _ => Err(D::Error::custom(
                "condition table must end with an unconditional \"true\" row",
            )),
        }
    }
}
