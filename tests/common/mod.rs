#![allow(dead_code)]

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicU32, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use forgeflow::{
    Engine, EngineBuilder, FlowDefinition,
    executors::{
        ExecutorRegistry,
        providers::{
            BrandGuardProvider, BrandReview, BrandVerdict, Completion, ImageProvider, ImageRequest, LlmProvider, LlmRequest, MediaAsset, Notification, NotificationSink,
            ProviderError,
        },
    },
    flow::{
        FlowEdge, FlowNode, NodeKind, SourceHandle,
        config::{ComparisonOperator, Condition, ConditionConfig, ConditionValue, HttpConfig, ImageConfig, LlmConfig, LogicalOperator, NotificationConfig, TriggerConfig},
    },
    store::data::FlowRunNode,
};
use serde_json::Value;

/// Prompts containing this marker fail permanently.
pub const FAIL: &str = "FAIL";

/// LLM provider with scripted behavior.
#[derive(Default)]
pub struct MockLlm {
    /// transient failures to return before the first success
    pub transient_failures: AtomicU32,
    pub delay: Option<Duration>,
    /// sparks reported on success
    pub sparks: Option<u64>,
    pub calls: AtomicU32,
    pub prompts: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl MockLlm {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay: Some(delay),
            ..Default::default()
        })
    }

    pub fn with_transient_failures(n: u32) -> Arc<Self> {
        Arc::new(Self {
            transient_failures: AtomicU32::new(n),
            ..Default::default()
        })
    }

    pub fn with_sparks(sparks: u64) -> Arc<Self> {
        Arc::new(Self {
            sparks: Some(sparks),
            ..Default::default()
        })
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for MockLlm {
    async fn complete(
        &self,
        request: LlmRequest,
    ) -> Result<Completion, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(request.prompt.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if request.prompt.contains(FAIL) {
            return Err(ProviderError::permanent("model refused the prompt"));
        }
        let pending = self.transient_failures.load(Ordering::SeqCst);
        if pending > 0 {
            self.transient_failures.store(pending - 1, Ordering::SeqCst);
            return Err(ProviderError::transient("rate limited"));
        }

        Ok(Completion {
            text: format!("copy: {}", request.prompt),
            model: Some("mock-1".to_string()),
            sparks: self.sparks,
        })
    }
}

#[derive(Default)]
pub struct MockImage {
    pub calls: AtomicU32,
}

#[async_trait]
impl ImageProvider for MockImage {
    async fn generate_image(
        &self,
        request: ImageRequest,
    ) -> Result<MediaAsset, ProviderError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if request.prompt.contains(FAIL) {
            return Err(ProviderError::permanent("unsafe image prompt"));
        }
        Ok(MediaAsset {
            url: format!("https://cdn.test/{}.png", n),
            sparks: None,
        })
    }
}

pub struct MockBrandGuard {
    pub approved: bool,
    pub score: f32,
}

#[async_trait]
impl BrandGuardProvider for MockBrandGuard {
    async fn review(
        &self,
        review: BrandReview,
    ) -> Result<BrandVerdict, ProviderError> {
        Ok(BrandVerdict {
            approved: self.approved,
            score: self.score,
            issues: if self.approved { vec![] } else { vec![format!("'{}' is off brand", review.content)] },
            sparks: None,
        })
    }
}

#[derive(Default)]
pub struct Outbox {
    pub sent: Mutex<Vec<Notification>>,
}

impl Outbox {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSink for Outbox {
    async fn send(
        &self,
        notification: Notification,
    ) -> Result<(), ProviderError> {
        self.sent.lock().unwrap().push(notification);
        Ok(())
    }
}

pub fn registry(llm: Arc<MockLlm>) -> ExecutorRegistry {
    ExecutorRegistry::new().with_llm(llm).with_image(Arc::new(MockImage::default())).with_notifications(Arc::new(Outbox::default()))
}

/// A launched engine with default options.
pub fn engine(registry: ExecutorRegistry) -> Engine {
    launched(EngineBuilder::new().registry(registry))
}

pub fn launched(builder: EngineBuilder) -> Engine {
    let engine = builder.build().unwrap();
    engine.launch().unwrap();
    engine
}

pub fn trigger(
    id: &str,
    payload: Value,
) -> FlowNode {
    FlowNode::new(
        id,
        NodeKind::Trigger(TriggerConfig {
            payload: Some(payload),
        }),
    )
}

pub fn llm(
    id: &str,
    prompt: &str,
) -> FlowNode {
    FlowNode::new(
        id,
        NodeKind::Llm(LlmConfig {
            prompt: prompt.to_string(),
            ..Default::default()
        }),
    )
}

pub fn image(
    id: &str,
    prompt: &str,
) -> FlowNode {
    FlowNode::new(
        id,
        NodeKind::Image(ImageConfig {
            prompt: prompt.to_string(),
            ..Default::default()
        }),
    )
}

pub fn http(
    id: &str,
    url: &str,
) -> FlowNode {
    FlowNode::new(
        id,
        NodeKind::Http(HttpConfig {
            url: url.to_string(),
            ..Default::default()
        }),
    )
}

pub fn notify(
    id: &str,
    message: &str,
) -> FlowNode {
    FlowNode::new(
        id,
        NodeKind::Notification(NotificationConfig {
            message: message.to_string(),
            ..Default::default()
        }),
    )
}

/// A condition node testing `selector == value`.
pub fn condition(
    id: &str,
    selector: &str,
    value: &str,
) -> FlowNode {
    FlowNode::new(
        id,
        NodeKind::Condition(ConditionConfig {
            logical_operator: LogicalOperator::And,
            conditions: vec![Condition {
                variable_selector: selector.to_string(),
                comparison_operator: ComparisonOperator::Is,
                value: Some(ConditionValue::Str(value.to_string())),
            }],
        }),
    )
}

pub fn edge(
    source: &str,
    target: &str,
) -> FlowEdge {
    FlowEdge::new(format!("{}->{}", source, target), source, target)
}

pub fn branch(
    source: &str,
    target: &str,
    outcome: bool,
) -> FlowEdge {
    edge(source, target).with_handle(if outcome { SourceHandle::True } else { SourceHandle::False })
}

pub fn flow(
    nodes: Vec<FlowNode>,
    edges: Vec<FlowEdge>,
) -> FlowDefinition {
    FlowDefinition::new(nodes, edges).with_id("flow-test")
}

pub fn node<'a>(
    nodes: &'a [FlowRunNode],
    id: &str,
) -> &'a FlowRunNode {
    nodes.iter().find(|n| n.node_id == id).unwrap_or_else(|| panic!("no record for node '{}'", id))
}
