//! Event types for flow runs.
//!
//! Every run and node transition is published on the engine
//! [`Channel`](crate::runtime::Channel) as a [`Message`].

mod node;
mod run;

pub use node::*;
pub use run::*;

use crate::{flow::NodeId, runtime::RunId};

/// Generic event wrapper.
#[derive(Debug, Clone)]
pub struct Event<T> {
    inner: T,
}

/// Top-level event type.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowEvent {
    /// Run-level events (started, succeeded, failed, aborted).
    Run(RunEvent),
    /// Node-level events (running, retry, succeeded, failed, skipped).
    Node(NodeEvent),
}

/// Event message with its run and node context.
#[derive(Debug, Clone)]
pub struct Message {
    pub run_id: RunId,
    /// empty for run events
    pub node_id: NodeId,
    pub event: FlowEvent,
}

impl Message {
    pub fn run(
        run_id: &str,
        event: RunEvent,
    ) -> Self {
        Self {
            run_id: run_id.to_string(),
            node_id: String::new(),
            event: FlowEvent::Run(event),
        }
    }

    pub fn node(
        run_id: &str,
        node_id: &str,
        event: NodeEvent,
    ) -> Self {
        Self {
            run_id: run_id.to_string(),
            node_id: node_id.to_string(),
            event: FlowEvent::Node(event),
        }
    }
}

impl<T> std::ops::Deref for Event<T>
where
    T: std::fmt::Debug + Clone,
{
    type Target = T;
    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<T> Event<T>
where
    T: std::fmt::Debug + Clone,
{
    pub fn new(inner: &T) -> Self {
        Self {
            inner: inner.clone(),
        }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }
}

impl FlowEvent {
    pub fn is_complete(&self) -> bool {
        matches!(self, FlowEvent::Run(RunEvent::Succeeded { .. }))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, FlowEvent::Run(RunEvent::Failed { .. }))
    }

    /// Whether this event ends a run, whatever the outcome.
    pub fn is_terminal(&self) -> bool {
        matches!(self, FlowEvent::Run(e) if e.is_terminal())
    }
}
