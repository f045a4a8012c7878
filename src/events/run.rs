use crate::flow::NodeId;

#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    Started {
        flow_id: String,
        /// execution order
        node_ids: Vec<NodeId>,
    },
    Succeeded {
        total_sparks_spent: u64,
    },
    Failed {
        error: String,
        total_sparks_spent: u64,
    },
    Aborted {
        reason: String,
        total_sparks_spent: u64,
    },
}

impl RunEvent {
    pub fn str(&self) -> &str {
        match self {
            RunEvent::Started { .. } => "Started",
            RunEvent::Succeeded { .. } => "Succeeded",
            RunEvent::Failed { .. } => "Failed",
            RunEvent::Aborted { .. } => "Aborted",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunEvent::Started { .. })
    }
}
