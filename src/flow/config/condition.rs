//! Configuration of `condition` nodes.

use serde::{Deserialize, Serialize};

/// How the results of several conditions combine.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LogicalOperator {
    #[default]
    And,
    Or,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ComparisonOperator {
    // string or array
    Contains,
    NotContains,
    StartWith,
    EndWith,
    Is,
    IsNot,
    Empty,
    NotEmpty,
    In,
    NotIn,
    AllOf,
    // number
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
    // presence
    Null,
    NotNull,
}

/// Right-hand side of a comparison as authored in the editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionValue {
    Bool(bool),
    Number(f64),
    Str(String),
    List(Vec<String>),
}

impl ConditionValue {
    /// Scalar values as text; lists have no scalar form.
    pub fn as_text(&self) -> Option<String> {
        match self {
            ConditionValue::Bool(b) => Some(b.to_string()),
            ConditionValue::Number(n) => Some(n.to_string()),
            ConditionValue::Str(s) => Some(s.clone()),
            ConditionValue::List(_) => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            ConditionValue::Number(n) => Some(*n),
            ConditionValue::Str(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// template selecting the value under test, e.g. `{{#review.score#}}`
    #[serde(default)]
    pub variable_selector: String,
    pub comparison_operator: ComparisonOperator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<ConditionValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConditionConfig {
    pub logical_operator: LogicalOperator,
    pub conditions: Vec<Condition>,
}
