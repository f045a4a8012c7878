//! Flow edges: "target depends on source".
//!
//! Edges leaving a `condition` node are gated by the source handle they are
//! attached to (`true`/`false`); every other edge is unconditional.

use serde::{Deserialize, Serialize};

use crate::{flow::node::NodeId, model::EdgeModel};

/// Unique identifier for an edge within a flow.
pub type EdgeId = String;

/// Output handle of the source node an edge leaves from.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, Hash, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SourceHandle {
    /// Default output handle.
    #[default]
    Source,
    /// Taken when a condition evaluates true.
    True,
    /// Taken when a condition evaluates false.
    False,
}

impl SourceHandle {
    /// Whether an edge on this handle is live for a condition outcome.
    ///
    /// A plain `source` edge out of a condition behaves like `true`.
    pub fn accepts(
        &self,
        outcome: bool,
    ) -> bool {
        match self {
            SourceHandle::Source | SourceHandle::True => outcome,
            SourceHandle::False => !outcome,
        }
    }

    pub fn is_branch(&self) -> bool {
        !matches!(self, SourceHandle::Source)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FlowEdge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    #[serde(default)]
    pub source_handle: SourceHandle,
}

impl FlowEdge {
    pub fn new(
        id: impl Into<EdgeId>,
        source: impl Into<NodeId>,
        target: impl Into<NodeId>,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            source_handle: SourceHandle::Source,
        }
    }

    pub fn with_handle(
        mut self,
        handle: SourceHandle,
    ) -> Self {
        self.source_handle = handle;
        self
    }
}

impl From<&EdgeModel> for FlowEdge {
    fn from(model: &EdgeModel) -> Self {
        Self {
            id: model.id.clone(),
            source: model.source.clone(),
            target: model.target.clone(),
            source_handle: model.source_handle,
        }
    }
}

impl From<&FlowEdge> for EdgeModel {
    fn from(edge: &FlowEdge) -> Self {
        Self {
            id: edge.id.clone(),
            source: edge.source.clone(),
            target: edge.target.clone(),
            source_handle: edge.source_handle,
        }
    }
}
