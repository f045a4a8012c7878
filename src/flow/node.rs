//! Flow nodes: the typed form of a [`NodeModel`].

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
    ForgeError, Result,
    flow::config::*,
    model::{NodeModel, Position, RetryConfig},
};

/// node id, unique within a flow
pub type NodeId = String;

/// The closed set of node types a flow may contain.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, strum::AsRefStr, strum::Display, strum::EnumString, strum::EnumIter)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum NodeType {
    Trigger,
    Llm,
    Image,
    Video,
    BrandGuard,
    Condition,
    Http,
    Notification,
}

/// Node type together with its typed configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Trigger(TriggerConfig),
    Llm(LlmConfig),
    Image(ImageConfig),
    Video(VideoConfig),
    BrandGuard(BrandGuardConfig),
    Condition(ConditionConfig),
    Http(HttpConfig),
    Notification(NotificationConfig),
}

impl NodeKind {
    pub fn node_type(&self) -> NodeType {
        match self {
            NodeKind::Trigger(_) => NodeType::Trigger,
            NodeKind::Llm(_) => NodeType::Llm,
            NodeKind::Image(_) => NodeType::Image,
            NodeKind::Video(_) => NodeType::Video,
            NodeKind::BrandGuard(_) => NodeType::BrandGuard,
            NodeKind::Condition(_) => NodeType::Condition,
            NodeKind::Http(_) => NodeType::Http,
            NodeKind::Notification(_) => NodeType::Notification,
        }
    }

    /// A node of `node_type` with every config field at its default.
    pub fn empty(node_type: NodeType) -> Self {
        match node_type {
            NodeType::Trigger => NodeKind::Trigger(TriggerConfig::default()),
            NodeType::Llm => NodeKind::Llm(LlmConfig::default()),
            NodeType::Image => NodeKind::Image(ImageConfig::default()),
            NodeType::Video => NodeKind::Video(VideoConfig::default()),
            NodeType::BrandGuard => NodeKind::BrandGuard(BrandGuardConfig::default()),
            NodeType::Condition => NodeKind::Condition(ConditionConfig::default()),
            NodeType::Http => NodeKind::Http(HttpConfig::default()),
            NodeType::Notification => NodeKind::Notification(NotificationConfig::default()),
        }
    }

    /// Decode the untyped `config` object of a wire node.
    ///
    /// A missing (`null`) config decodes to the defaults.
    pub fn from_config(
        node_type: NodeType,
        config: &serde_json::Value,
    ) -> Result<Self> {
        if config.is_null() {
            return Ok(Self::empty(node_type));
        }

        let config = config.clone();
        let kind = match node_type {
            NodeType::Trigger => NodeKind::Trigger(serde_json::from_value(config)?),
            NodeType::Llm => NodeKind::Llm(serde_json::from_value(config)?),
            NodeType::Image => NodeKind::Image(serde_json::from_value(config)?),
            NodeType::Video => NodeKind::Video(serde_json::from_value(config)?),
            NodeType::BrandGuard => NodeKind::BrandGuard(serde_json::from_value(config)?),
            NodeType::Condition => NodeKind::Condition(serde_json::from_value(config)?),
            NodeType::Http => NodeKind::Http(serde_json::from_value(config)?),
            NodeType::Notification => NodeKind::Notification(serde_json::from_value(config)?),
        };
        Ok(kind)
    }

    pub fn to_config(&self) -> Result<serde_json::Value> {
        let value = match self {
            NodeKind::Trigger(c) => serde_json::to_value(c)?,
            NodeKind::Llm(c) => serde_json::to_value(c)?,
            NodeKind::Image(c) => serde_json::to_value(c)?,
            NodeKind::Video(c) => serde_json::to_value(c)?,
            NodeKind::BrandGuard(c) => serde_json::to_value(c)?,
            NodeKind::Condition(c) => serde_json::to_value(c)?,
            NodeKind::Http(c) => serde_json::to_value(c)?,
            NodeKind::Notification(c) => serde_json::to_value(c)?,
        };
        Ok(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlowNode {
    /// node id
    pub id: NodeId,
    /// label shown on the canvas
    pub label: String,
    /// node type and typed config
    pub kind: NodeKind,
    /// canvas position, ignored by the engine
    pub position: Position,
    /// retry policy applied when the executor fails
    pub retry: Option<RetryConfig>,
    /// executor timeout per attempt
    pub timeout: Option<Duration>,
    /// a failed optional node does not fail the run
    pub optional: bool,
}

impl FlowNode {
    pub fn new(
        id: impl Into<NodeId>,
        kind: NodeKind,
    ) -> Self {
        Self {
            id: id.into(),
            label: String::new(),
            kind,
            position: Position::default(),
            retry: None,
            timeout: None,
            optional: false,
        }
    }

    pub fn with_label(
        mut self,
        label: impl Into<String>,
    ) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_retry(
        mut self,
        times: u32,
        interval_ms: u64,
    ) -> Self {
        self.retry = Some(RetryConfig {
            times,
            interval: interval_ms,
        });
        self
    }

    pub fn with_timeout(
        mut self,
        timeout: Duration,
    ) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn node_type(&self) -> NodeType {
        self.kind.node_type()
    }

    /// Label when set, id otherwise.
    pub fn display_name(&self) -> &str {
        if self.label.trim().is_empty() { &self.id } else { &self.label }
    }
}

impl TryFrom<&NodeModel> for FlowNode {
    type Error = ForgeError;

    fn try_from(model: &NodeModel) -> Result<Self> {
        let kind = NodeKind::from_config(model.node_type, &model.config)
            .map_err(|e| ForgeError::Node(format!("invalid config for {} node '{}': {}", model.node_type, model.id, e)))?;

        Ok(Self {
            id: model.id.clone(),
            label: model.label.clone(),
            kind,
            position: model.position,
            retry: model.retry,
            timeout: model.timeout.map(Duration::from_millis),
            optional: model.optional,
        })
    }
}

impl TryFrom<&FlowNode> for NodeModel {
    type Error = ForgeError;

    fn try_from(node: &FlowNode) -> Result<Self> {
        Ok(Self {
            id: node.id.clone(),
            node_type: node.node_type(),
            label: node.label.clone(),
            config: node.kind.to_config()?,
            position: node.position,
            retry: node.retry,
            timeout: node.timeout.map(|t| t.as_millis() as u64),
            optional: node.optional,
        })
    }
}
