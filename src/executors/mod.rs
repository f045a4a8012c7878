//! Node executors: one execution contract per node type.
//!
//! The core ships [`TriggerExecutor`], [`ConditionExecutor`] and the
//! `reqwest`-backed [`HttpExecutor`]. The AI and notification node types run
//! through adapters over capability providers the host supplies (see
//! [`providers`]).

mod brandguard;
mod condition;
mod http_request;
mod llm;
mod media;
mod notification;
pub mod providers;
mod registry;
mod trigger;

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::flow::{
    FlowNode, NodeId, NodeType,
    template::{self, Scope},
};

pub use brandguard::BrandGuardExecutor;
pub use condition::ConditionExecutor;
pub use http_request::HttpExecutor;
pub use llm::LlmExecutor;
pub use media::{ImageExecutor, VideoExecutor};
pub use notification::NotificationExecutor;
pub use registry::ExecutorRegistry;
pub use trigger::TriggerExecutor;

#[async_trait]
pub trait NodeExecutor: Send + Sync {
    /// The node type this executor runs.
    fn node_type(&self) -> NodeType;

    /// Executes one attempt of a node.
    ///
    /// # Arguments
    ///
    /// * `input` - The node, the outputs of its upstream nodes and the flow env.
    ///
    /// # Returns
    ///
    /// The produced value, or the reason the attempt failed. Retries and
    /// timeouts are applied by the caller.
    async fn execute(
        &self,
        input: ExecutorInput,
    ) -> Result<ExecutorOutput, NodeFailure>;
}

/// Everything an executor sees while running one node.
#[derive(Debug, Clone)]
pub struct ExecutorInput {
    pub run_id: String,
    pub node: FlowNode,
    /// outputs of the node's direct predecessors that succeeded
    pub upstream: BTreeMap<NodeId, Value>,
    pub env: HashMap<String, String>,
}

impl ExecutorInput {
    pub fn scope(&self) -> Scope<'_> {
        Scope::new(&self.upstream, &self.env)
    }

    /// Resolve template variables in a config string.
    pub fn resolve(
        &self,
        text: &str,
    ) -> Result<String, NodeFailure> {
        template::resolve_template(&self.scope(), text).map_err(|e| NodeFailure::InvalidInput(e.to_string()))
    }

    pub fn resolve_opt(
        &self,
        text: Option<&str>,
    ) -> Result<Option<String>, NodeFailure> {
        text.map(|t| self.resolve(t)).transpose()
    }

    pub fn resolve_json(
        &self,
        value: &Value,
    ) -> Result<Value, NodeFailure> {
        template::resolve_json_value(&self.scope(), value).map_err(|e| NodeFailure::InvalidInput(e.to_string()))
    }
}

/// Result of a successful attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutorOutput {
    pub value: Value,
    /// sparks actually spent; the cost table price is charged when `None`
    pub sparks: Option<u64>,
    /// outcome of a condition node
    pub branch: Option<bool>,
}

impl ExecutorOutput {
    pub fn new(value: Value) -> Self {
        Self {
            value,
            sparks: None,
            branch: None,
        }
    }

    pub fn with_sparks(
        mut self,
        sparks: Option<u64>,
    ) -> Self {
        self.sparks = sparks;
        self
    }

    pub fn with_branch(
        mut self,
        outcome: bool,
    ) -> Self {
        self.branch = Some(outcome);
        self
    }
}

/// Why one attempt of a node failed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NodeFailure {
    #[error("no executor registered for node type '{0}'")]
    NoExecutor(NodeType),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("timed out after {0} ms")]
    Timeout(u64),

    #[error("provider error: {message}")]
    Provider {
        message: String,
        retryable: bool,
    },

    #[error("rejected: {0}")]
    Rejected(String),

    #[error("{0}")]
    Failed(String),
}

impl NodeFailure {
    /// Whether another attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            NodeFailure::Timeout(_) | NodeFailure::Failed(_) => true,
            NodeFailure::Provider {
                retryable, ..
            } => *retryable,
            NodeFailure::NoExecutor(_) | NodeFailure::InvalidInput(_) | NodeFailure::Rejected(_) => false,
        }
    }
}

impl From<providers::ProviderError> for NodeFailure {
    fn from(err: providers::ProviderError) -> Self {
        NodeFailure::Provider {
            message: err.message,
            retryable: err.retryable,
        }
    }
}

/// Wrong node kind handed to an executor.
pub(crate) fn kind_mismatch(
    expected: NodeType,
    node: &FlowNode,
) -> NodeFailure {
    NodeFailure::InvalidInput(format!("{} executor cannot run {} node '{}'", expected, node.node_type(), node.id))
}

#[cfg(test)]
pub(crate) mod test_util {
    use std::collections::{BTreeMap, HashMap};

    use serde_json::Value;

    use crate::flow::FlowNode;

    use super::ExecutorInput;

    pub fn input(node: FlowNode) -> ExecutorInput {
        ExecutorInput {
            run_id: "run-1".to_string(),
            node,
            upstream: BTreeMap::new(),
            env: HashMap::new(),
        }
    }

    pub fn with_upstream(
        mut input: ExecutorInput,
        node_id: &str,
        value: Value,
    ) -> ExecutorInput {
        input.upstream.insert(node_id.to_string(), value);
        input
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::executors::providers::ProviderError;

    #[test]
    fn test_retryable_failures() {
        assert!(NodeFailure::Timeout(100).is_retryable());
        assert!(NodeFailure::Failed("boom".into()).is_retryable());
        assert!(NodeFailure::from(ProviderError::transient("rate limited")).is_retryable());

        assert!(!NodeFailure::from(ProviderError::permanent("bad key")).is_retryable());
        assert!(!NodeFailure::InvalidInput("x".into()).is_retryable());
        assert!(!NodeFailure::Rejected("off brand".into()).is_retryable());
        assert!(!NodeFailure::NoExecutor(NodeType::Video).is_retryable());
    }

    #[test]
    fn test_failure_messages() {
        assert_eq!(NodeFailure::NoExecutor(NodeType::Video).to_string(), "no executor registered for node type 'video'");
        assert_eq!(NodeFailure::Timeout(250).to_string(), "timed out after 250 ms");
    }
}
