use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Comparison operators used by condition evaluation.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ConditionOperator {
    #[serde(alias = "==", alias = "=")]
    Equals,
    #[serde(alias = "!=", alias = "≠")]
    NotEquals,
    #[serde(alias = ">")]
    GreaterThan,
    #[serde(alias = "<")]
    LessThan,
    #[serde(alias = ">=", alias = "≥")]
    GreaterOrEqual,
    #[serde(alias = "<=", alias = "≤")]
    LessOrEqual,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    IsEmpty,
    IsNotEmpty,
}

impl ConditionOperator {
    /// Operators that only look at the left operand.
    pub fn is_unary(&self) -> bool {
        matches!(self, ConditionOperator::IsEmpty | ConditionOperator::IsNotEmpty)
    }
}

/// A single comparison test used by branching and iteration nodes.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Condition {
    /// A `{{name.path}}` reference to the left operand.
    pub variable: String,
    pub operator: ConditionOperator,
    #[serde(default)]
    pub value: Value,
}

impl Condition {
    pub fn new(variable: impl Into<String>, operator: ConditionOperator, value: Value) -> Self {
        Self {
            variable: variable.into(),
            operator,
            value,
        }
    }
}

/// How a list of conditions is combined.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConditionMode {
    /// Logical AND.
    #[default]
    #[serde(alias = "and")]
    All,
    /// Logical OR.
    #[serde(alias = "or")]
    Any,
}
