use async_trait::async_trait;
use serde_json::{Value, json};

use crate::{
    executors::{ExecutorInput, ExecutorOutput, NodeExecutor, NodeFailure, kind_mismatch},
    flow::{NodeKind, NodeType},
};

/// Entry point of a flow: succeeds with its configured payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct TriggerExecutor;

#[async_trait]
impl NodeExecutor for TriggerExecutor {
    fn node_type(&self) -> NodeType {
        NodeType::Trigger
    }

    async fn execute(
        &self,
        input: ExecutorInput,
    ) -> Result<ExecutorOutput, NodeFailure> {
        let NodeKind::Trigger(config) = &input.node.kind else {
            return Err(kind_mismatch(NodeType::Trigger, &input.node));
        };

        let payload = match &config.payload {
            Some(payload) => input.resolve_json(payload)?,
            None => json!({}),
        };
        Ok(ExecutorOutput::new(payload))
    }
}
