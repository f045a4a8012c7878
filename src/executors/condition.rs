use async_trait::async_trait;
use serde_json::{Value, json};

use crate::{
    executors::{ExecutorInput, ExecutorOutput, NodeExecutor, NodeFailure, kind_mismatch},
    flow::{
        NodeKind, NodeType,
        config::{ComparisonOperator, Condition, ConditionValue, LogicalOperator},
        template,
    },
};

/// Evaluates a `condition` node against upstream outputs.
///
/// The outcome decides which outgoing edges (`true`/`false` handles) stay
/// live. `variable_selector` may reference upstream outputs or env
/// variables. An unresolved selector compares as a missing value, it does
/// not fail the node.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConditionExecutor;

impl ConditionExecutor {
    fn evaluate(
        &self,
        input: &ExecutorInput,
        conditions: &[Condition],
        logical_operator: LogicalOperator,
    ) -> bool {
        let scope = input.scope();
        let mut results = conditions.iter().map(|condition| {
            let actual = template::resolve_template_to_values(&scope, &condition.variable_selector).ok().and_then(|v| v.into_iter().next());
            evaluate_comparison(actual.as_ref(), condition.comparison_operator, condition.value.as_ref())
        });

        match logical_operator {
            LogicalOperator::And => results.all(|r| r),
            LogicalOperator::Or => results.any(|r| r),
        }
    }
}

#[async_trait]
impl NodeExecutor for ConditionExecutor {
    fn node_type(&self) -> NodeType {
        NodeType::Condition
    }

    async fn execute(
        &self,
        input: ExecutorInput,
    ) -> Result<ExecutorOutput, NodeFailure> {
        let NodeKind::Condition(config) = &input.node.kind else {
            return Err(kind_mismatch(NodeType::Condition, &input.node));
        };
        if config.conditions.is_empty() {
            return Err(NodeFailure::InvalidInput(format!("condition node '{}' has no conditions", input.node.id)));
        }

        let outcome = self.evaluate(&input, &config.conditions, config.logical_operator);
        Ok(ExecutorOutput::new(json!({ "result": outcome })).with_branch(outcome))
    }
}

fn evaluate_comparison(
    actual: Option<&Value>,
    operator: ComparisonOperator,
    expected: Option<&ConditionValue>,
) -> bool {
    match operator {
        ComparisonOperator::Null => matches!(actual, None | Some(Value::Null)),
        ComparisonOperator::NotNull => !matches!(actual, None | Some(Value::Null)),
        ComparisonOperator::Empty => is_empty(actual),
        ComparisonOperator::NotEmpty => !is_empty(actual),
        _ => match (actual, expected) {
            (Some(actual), Some(expected)) => evaluate_with_value(actual, operator, expected),
            _ => false,
        },
    }
}

fn is_empty(actual: Option<&Value>) -> bool {
    match actual {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Array(arr)) => arr.is_empty(),
        Some(Value::Object(obj)) => obj.is_empty(),
        _ => false,
    }
}

fn evaluate_with_value(
    actual: &Value,
    operator: ComparisonOperator,
    expected: &ConditionValue,
) -> bool {
    match operator {
        ComparisonOperator::Contains => contains(actual, expected),
        ComparisonOperator::NotContains => !contains(actual, expected),
        ComparisonOperator::StartWith => text_pair(actual, expected).is_some_and(|(a, e)| a.starts_with(&e)),
        ComparisonOperator::EndWith => text_pair(actual, expected).is_some_and(|(a, e)| a.ends_with(&e)),
        ComparisonOperator::Is => text_pair(actual, expected).is_some_and(|(a, e)| a == e),
        ComparisonOperator::IsNot => !text_pair(actual, expected).is_some_and(|(a, e)| a == e),
        ComparisonOperator::In => is_in(actual, expected),
        ComparisonOperator::NotIn => !is_in(actual, expected),
        ComparisonOperator::AllOf => all_of(actual, expected),
        ComparisonOperator::Eq => equals(actual, expected),
        ComparisonOperator::Ne => !equals(actual, expected),
        ComparisonOperator::Gt => compare(actual, expected, |a, b| a > b),
        ComparisonOperator::Lt => compare(actual, expected, |a, b| a < b),
        ComparisonOperator::Ge => compare(actual, expected, |a, b| a >= b),
        ComparisonOperator::Le => compare(actual, expected, |a, b| a <= b),
        ComparisonOperator::Null | ComparisonOperator::NotNull | ComparisonOperator::Empty | ComparisonOperator::NotEmpty => false,
    }
}

/// Scalar JSON as text.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn scalar_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn text_pair(
    actual: &Value,
    expected: &ConditionValue,
) -> Option<(String, String)> {
    Some((scalar_text(actual)?, expected.as_text()?))
}

fn contains(
    actual: &Value,
    expected: &ConditionValue,
) -> bool {
    let Some(needle) = expected.as_text() else {
        return false;
    };
    match actual {
        Value::String(s) => s.contains(&needle),
        Value::Array(items) => items.iter().any(|v| scalar_text(v).as_deref() == Some(needle.as_str())),
        _ => false,
    }
}

fn is_in(
    actual: &Value,
    expected: &ConditionValue,
) -> bool {
    let Some(actual) = scalar_text(actual) else {
        return false;
    };
    match expected {
        ConditionValue::List(list) => list.contains(&actual),
        ConditionValue::Str(s) => s.contains(actual.as_str()),
        _ => false,
    }
}

fn all_of(
    actual: &Value,
    expected: &ConditionValue,
) -> bool {
    match (actual, expected) {
        (Value::Array(items), ConditionValue::List(list)) => list.iter().all(|e| items.iter().any(|v| scalar_text(v).as_deref() == Some(e.as_str()))),
        _ => false,
    }
}

fn equals(
    actual: &Value,
    expected: &ConditionValue,
) -> bool {
    match (scalar_number(actual), expected.as_number()) {
        (Some(a), Some(e)) => a == e,
        _ => text_pair(actual, expected).is_some_and(|(a, e)| a == e),
    }
}

fn compare<F>(
    actual: &Value,
    expected: &ConditionValue,
    cmp: F,
) -> bool
where
    F: Fn(f64, f64) -> bool,
{
    match (scalar_number(actual), expected.as_number()) {
        (Some(a), Some(e)) => cmp(a, e),
        _ => false,
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;
    use crate::{
        executors::test_util::{input, with_upstream},
        flow::{FlowNode, config::ConditionConfig},
    };

    fn condition(
        selector: &str,
        operator: ComparisonOperator,
        value: Option<ConditionValue>,
    ) -> Condition {
        Condition {
            variable_selector: selector.to_string(),
            comparison_operator: operator,
            value,
        }
    }

    fn gate(
        logical_operator: LogicalOperator,
        conditions: Vec<Condition>,
    ) -> FlowNode {
        FlowNode::new(
            "gate",
            NodeKind::Condition(ConditionConfig {
                logical_operator,
                conditions,
            }),
        )
    }

    fn str_value(s: &str) -> Option<ConditionValue> {
        Some(ConditionValue::Str(s.to_string()))
    }

    async fn run(
        node: FlowNode,
        upstream: Value,
    ) -> bool {
        let output = ConditionExecutor.execute(with_upstream(input(node), "review", upstream)).await.unwrap();
        assert_eq!(output.value, json!({ "result": output.branch.unwrap() }));
        output.branch.unwrap()
    }

    #[tokio::test]
    async fn test_numeric_comparisons() {
        let review = json!({ "score": 0.82, "tier": "pro" });

        assert!(run(gate(LogicalOperator::And, vec![condition("{{#review.score#}}", ComparisonOperator::Ge, Some(ConditionValue::Number(0.8)))]), review.clone()).await);
        assert!(!run(gate(LogicalOperator::And, vec![condition("{{#review.score#}}", ComparisonOperator::Lt, str_value("0.5"))]), review.clone()).await);
        assert!(run(gate(LogicalOperator::And, vec![condition("{{#review.score#}}", ComparisonOperator::Eq, str_value("0.82"))]), review).await);
    }

    #[tokio::test]
    async fn test_string_comparisons() {
        let review = json!({ "text": "Spring sale starts now", "tags": ["promo", "spring"], "approved": true });

        assert!(run(gate(LogicalOperator::And, vec![condition("{{#review.text#}}", ComparisonOperator::Contains, str_value("sale"))]), review.clone()).await);
        assert!(run(gate(LogicalOperator::And, vec![condition("{{#review.text#}}", ComparisonOperator::StartWith, str_value("Spring"))]), review.clone()).await);
        assert!(run(gate(LogicalOperator::And, vec![condition("{{#review.tags#}}", ComparisonOperator::Contains, str_value("promo"))]), review.clone()).await);
        assert!(
            run(
                gate(LogicalOperator::And, vec![condition("{{#review.tags#}}", ComparisonOperator::AllOf, Some(ConditionValue::List(vec!["spring".into(), "promo".into()])))]),
                review.clone()
            )
            .await
        );
        assert!(run(gate(LogicalOperator::And, vec![condition("{{#review.approved#}}", ComparisonOperator::Is, Some(ConditionValue::Bool(true)))]), review).await);
    }

    #[tokio::test]
    async fn test_presence_checks() {
        let review = json!({ "issues": [], "note": null });

        assert!(run(gate(LogicalOperator::And, vec![condition("{{#review.issues#}}", ComparisonOperator::Empty, None)]), review.clone()).await);
        assert!(run(gate(LogicalOperator::And, vec![condition("{{#review.note#}}", ComparisonOperator::Null, None)]), review.clone()).await);
        assert!(run(gate(LogicalOperator::And, vec![condition("{{#review.missing#}}", ComparisonOperator::Null, None)]), review.clone()).await);
        assert!(!run(gate(LogicalOperator::And, vec![condition("{{#review.missing#}}", ComparisonOperator::Is, str_value("x"))]), review).await);
    }

    #[tokio::test]
    async fn test_logical_operators() {
        let review = json!({ "tier": "free" });
        let conditions = vec![
            condition("{{#review.tier#}}", ComparisonOperator::In, Some(ConditionValue::List(vec!["pro".into(), "team".into()]))),
            condition("{{#review.tier#}}", ComparisonOperator::Is, str_value("free")),
        ];

        assert!(!run(gate(LogicalOperator::And, conditions.clone()), review.clone()).await);
        assert!(run(gate(LogicalOperator::Or, conditions), review).await);
    }

    #[tokio::test]
    async fn test_env_selector() {
        let node = gate(LogicalOperator::And, vec![condition("{{$TIER$}}", ComparisonOperator::Is, str_value("pro"))]);

        let mut with_tier = input(node.clone());
        with_tier.env.insert("TIER".to_string(), "pro".to_string());
        assert_eq!(ConditionExecutor.execute(with_tier).await.unwrap().branch, Some(true));

        assert_eq!(ConditionExecutor.execute(input(node)).await.unwrap().branch, Some(false));
    }

    #[tokio::test]
    async fn test_no_conditions_is_invalid() {
        let err = ConditionExecutor.execute(input(gate(LogicalOperator::And, vec![]))).await.unwrap_err();
        assert!(matches!(err, NodeFailure::InvalidInput(_)));
    }
}
