use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::{
    executors::{
        ExecutorInput, ExecutorOutput, NodeExecutor, NodeFailure, kind_mismatch,
        providers::{LlmProvider, LlmRequest},
    },
    flow::{NodeKind, NodeType},
};

/// Runs `llm` nodes through the host's [`LlmProvider`].
///
/// Output: `{ "text": ..., "model": ... }`.
pub struct LlmExecutor {
    provider: Arc<dyn LlmProvider>,
}

impl LlmExecutor {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            provider,
        }
    }
}

#[async_trait]
impl NodeExecutor for LlmExecutor {
    fn node_type(&self) -> NodeType {
        NodeType::Llm
    }

    async fn execute(
        &self,
        input: ExecutorInput,
    ) -> Result<ExecutorOutput, NodeFailure> {
        let NodeKind::Llm(config) = &input.node.kind else {
            return Err(kind_mismatch(NodeType::Llm, &input.node));
        };

        let request = LlmRequest {
            prompt: input.resolve(&config.prompt)?,
            system: input.resolve_opt(config.system.as_deref())?,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        };
        if request.prompt.trim().is_empty() {
            return Err(NodeFailure::InvalidInput(format!("llm node '{}' resolved to an empty prompt", input.node.id)));
        }

        let completion = self.provider.complete(request).await?;
        let model = completion.model.or_else(|| config.model.clone());

        Ok(ExecutorOutput::new(json!({ "text": completion.text, "model": model })).with_sparks(completion.sparks))
    }
}
