use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::{
    executors::{
        ExecutorInput, ExecutorOutput, NodeExecutor, NodeFailure, kind_mismatch,
        providers::{BrandGuardProvider, BrandReview},
    },
    flow::{NodeKind, NodeType},
};

/// Reviews content against brand guidelines.
///
/// A rejected review, or a score under the node's `min_score`, fails the node
/// so everything downstream of it is skipped.
pub struct BrandGuardExecutor {
    provider: Arc<dyn BrandGuardProvider>,
}

impl BrandGuardExecutor {
    pub fn new(provider: Arc<dyn BrandGuardProvider>) -> Self {
        Self {
            provider,
        }
    }
}

/// Text produced upstream: string outputs and the `text` field of objects.
fn upstream_text(input: &ExecutorInput) -> String {
    input
        .upstream
        .values()
        .filter_map(|value| match value {
            Value::String(s) => Some(s.as_str()),
            Value::Object(obj) => obj.get("text").and_then(Value::as_str),
            _ => None,
        })
        .filter(|s| !s.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[async_trait]
impl NodeExecutor for BrandGuardExecutor {
    fn node_type(&self) -> NodeType {
        NodeType::BrandGuard
    }

    async fn execute(
        &self,
        input: ExecutorInput,
    ) -> Result<ExecutorOutput, NodeFailure> {
        let NodeKind::BrandGuard(config) = &input.node.kind else {
            return Err(kind_mismatch(NodeType::BrandGuard, &input.node));
        };

        let mut content = input.resolve(&config.content)?;
        if content.trim().is_empty() {
            content = upstream_text(&input);
        }
        if content.trim().is_empty() {
            return Err(NodeFailure::InvalidInput(format!("brand guard node '{}' has no content to review", input.node.id)));
        }

        let verdict = self
            .provider
            .review(BrandReview {
                content: content.clone(),
                guidelines: config.guidelines.clone(),
            })
            .await?;

        if !verdict.approved {
            let reason = if verdict.issues.is_empty() { "content is off brand".to_string() } else { verdict.issues.join("; ") };
            return Err(NodeFailure::Rejected(reason));
        }
        if let Some(min_score) = config.min_score {
            if verdict.score < min_score {
                return Err(NodeFailure::Rejected(format!("brand score {:.2} is below the minimum of {:.2}", verdict.score, min_score)));
            }
        }

        let value = json!({
            "approved": verdict.approved,
            "score": verdict.score,
            "issues": verdict.issues,
            "text": content,
        });
        Ok(ExecutorOutput::new(value).with_sparks(verdict.sparks))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        executors::{
            providers::{BrandVerdict, ProviderError},
            test_util::{input, with_upstream},
        },
        flow::{FlowNode, config::BrandGuardConfig},
    };

    /// Approves anything that does not shout.
    struct NoShouting;

    #[async_trait]
    impl BrandGuardProvider for NoShouting {
        async fn review(
            &self,
            review: BrandReview,
        ) -> Result<BrandVerdict, ProviderError> {
            let shouting = review.content.chars().filter(|c| c.is_alphabetic()).all(|c| c.is_uppercase());
            Ok(BrandVerdict {
                approved: !shouting,
                score: if shouting { 0.1 } else { 0.7 },
                issues: if shouting { vec!["all caps".to_string()] } else { vec![] },
                sparks: None,
            })
        }
    }

    fn guard(min_score: Option<f32>) -> FlowNode {
        FlowNode::new(
            "guard",
            NodeKind::BrandGuard(BrandGuardConfig {
                content: String::new(),
                guidelines: vec!["No shouting".to_string()],
                min_score,
            }),
        )
    }

    #[tokio::test]
    async fn test_reviews_upstream_text() {
        let input = with_upstream(input(guard(None)), "copy", json!({ "text": "Calm and friendly" }));
        let output = BrandGuardExecutor::new(Arc::new(NoShouting)).execute(input).await.unwrap();

        assert_eq!(output.value["approved"], json!(true));
        assert_eq!(output.value["text"], json!("Calm and friendly"));
    }

    #[tokio::test]
    async fn test_rejection_fails_the_node() {
        let input = with_upstream(input(guard(None)), "copy", json!("BUY NOW"));
        let err = BrandGuardExecutor::new(Arc::new(NoShouting)).execute(input).await.unwrap_err();

        assert_eq!(err, NodeFailure::Rejected("all caps".to_string()));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_low_score_fails_the_node() {
        let input = with_upstream(input(guard(Some(0.9))), "copy", json!("Calm and friendly"));
        let err = BrandGuardExecutor::new(Arc::new(NoShouting)).execute(input).await.unwrap_err();
        assert!(err.to_string().contains("below the minimum"));
    }

    #[tokio::test]
    async fn test_nothing_to_review() {
        let err = BrandGuardExecutor::new(Arc::new(NoShouting)).execute(input(guard(None))).await.unwrap_err();
        assert!(matches!(err, NodeFailure::InvalidInput(_)));
    }
}
