use std::{collections::HashMap, sync::Arc};

use crate::{
    executors::{
        BrandGuardExecutor, ConditionExecutor, HttpExecutor, ImageExecutor, LlmExecutor, NodeExecutor, NotificationExecutor, TriggerExecutor, VideoExecutor,
        providers::{BrandGuardProvider, ImageProvider, LlmProvider, NotificationSink, VideoProvider},
    },
    flow::{FlowDefinition, NodeType},
};

/// Node type -> executor.
///
/// Starts with the built-in `trigger` and `condition` executors; the host
/// adds the rest.
#[derive(Clone)]
pub struct ExecutorRegistry {
    executors: HashMap<NodeType, Arc<dyn NodeExecutor>>,
}

impl Default for ExecutorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ExecutorRegistry {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        let mut types: Vec<&NodeType> = self.executors.keys().collect();
        types.sort();
        f.debug_struct("ExecutorRegistry").field("types", &types).finish()
    }
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self {
            executors: HashMap::new(),
        }
        .with_executor(Arc::new(TriggerExecutor))
        .with_executor(Arc::new(ConditionExecutor))
    }

    /// Register `executor` for its node type, replacing any previous one.
    pub fn register(
        &mut self,
        executor: Arc<dyn NodeExecutor>,
    ) {
        self.executors.insert(executor.node_type(), executor);
    }

    pub fn with_executor(
        mut self,
        executor: Arc<dyn NodeExecutor>,
    ) -> Self {
        self.register(executor);
        self
    }

    pub fn with_llm(
        self,
        provider: Arc<dyn LlmProvider>,
    ) -> Self {
        self.with_executor(Arc::new(LlmExecutor::new(provider)))
    }

    pub fn with_image(
        self,
        provider: Arc<dyn ImageProvider>,
    ) -> Self {
        self.with_executor(Arc::new(ImageExecutor::new(provider)))
    }

    pub fn with_video(
        self,
        provider: Arc<dyn VideoProvider>,
    ) -> Self {
        self.with_executor(Arc::new(VideoExecutor::new(provider)))
    }

    pub fn with_brandguard(
        self,
        provider: Arc<dyn BrandGuardProvider>,
    ) -> Self {
        self.with_executor(Arc::new(BrandGuardExecutor::new(provider)))
    }

    pub fn with_notifications(
        self,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        self.with_executor(Arc::new(NotificationExecutor::new(sink)))
    }

    pub fn with_http(self) -> Self {
        self.with_executor(Arc::new(HttpExecutor::new()))
    }

    pub fn get(
        &self,
        node_type: NodeType,
    ) -> Option<Arc<dyn NodeExecutor>> {
        self.executors.get(&node_type).cloned()
    }

    pub fn contains(
        &self,
        node_type: NodeType,
    ) -> bool {
        self.executors.contains_key(&node_type)
    }

    /// Node types used by `def` that have no executor, sorted.
    pub fn missing_for(
        &self,
        def: &FlowDefinition,
    ) -> Vec<NodeType> {
        let mut missing: Vec<NodeType> = def.nodes.iter().map(|n| n.node_type()).filter(|t| !self.contains(*t)).collect();
        missing.sort();
        missing.dedup();
        missing
    }
}
