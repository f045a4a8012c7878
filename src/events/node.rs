use std::fmt;

use crate::store::data::SkipReason;

#[derive(Debug, Clone, PartialEq)]
pub enum NodeEvent {
    /// dispatched; carries the start time
    Running(i64),
    /// attempt `attempt` failed and another one follows
    Retry {
        attempt: u32,
        error: String,
    },
    Succeeded {
        sparks: u64,
    },
    Failed(String),
    Skipped(SkipReason),
}

impl NodeEvent {
    pub fn str(&self) -> &str {
        match self {
            NodeEvent::Running(_) => "Running",
            NodeEvent::Retry { .. } => "Retry",
            NodeEvent::Succeeded { .. } => "Succeeded",
            NodeEvent::Failed(_) => "Failed",
            NodeEvent::Skipped(_) => "Skipped",
        }
    }
}

impl fmt::Display for NodeEvent {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            NodeEvent::Running(at) => write!(f, "Running since {}", at),
            NodeEvent::Retry {
                attempt,
                error,
            } => write!(f, "Retry after attempt {}: {}", attempt, error),
            NodeEvent::Succeeded {
                sparks,
            } => write!(f, "Succeeded ({} sparks)", sparks),
            NodeEvent::Failed(err) => write!(f, "Failed: {}", err),
            NodeEvent::Skipped(reason) => write!(f, "Skipped: {}", reason.as_ref()),
        }
    }
}
