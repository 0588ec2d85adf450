//! Structured conditions evaluated by the renderer.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Comparison operator of a [`Condition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "===")]
    Equal,
    #[serde(rename = "!==")]
    NotEqual,
    #[serde(rename = ">")]
    Greater,
    #[serde(rename = "<")]
    Less,
    #[serde(rename = ">=")]
    GreaterOrEqual,
    #[serde(rename = "<=")]
    LessOrEqual,
}

impl Operator {
    /// Operator token in the renderer expression language.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equal => "===",
            Self::NotEqual => "!==",
            Self::Greater => ">",
            Self::Less => "<",
            Self::GreaterOrEqual => ">=",
            Self::LessOrEqual => "<=",
        }
    }
}

/// One side of a comparison.
///
/// Either a reference to a feature attribute, resolved by the renderer at
/// evaluation time, or a literal value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Operand {
    Field { field: String },
    Literal(Value),
}

impl Operand {
    pub fn field(name: impl Into<String>) -> Self {
        Self::Field { field: name.into() }
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        Self::Literal(value.into())
    }
}

/// A single comparison `operand operator value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Identifier of the condition within its owning module.
    pub key: String,
    pub operator: Operator,
    pub operand: Operand,
    pub value: Operand,
}

impl Condition {
    pub fn new(key: impl Into<String>, operand: Operand, operator: Operator, value: Operand) -> Self {
        Self {
            key: key.into(),
            operator,
            operand,
            value,
        }
    }
}
