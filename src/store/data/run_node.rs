use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    flow::NodeType,
    store::{DbCollectionIden, StoreIden},
};

/// `PENDING -> RUNNING -> {SUCCEEDED | FAILED | SKIPPED}`
#[derive(Deserialize, Serialize, Debug, Clone, Copy, Default, PartialEq, Eq, strum::AsRefStr, strum::Display, strum::EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RunNodeStatus {
    #[default]
    Pending,
    Running,
    Succeeded,
    Failed,
    Skipped,
}

impl RunNodeStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunNodeStatus::Succeeded | RunNodeStatus::Failed | RunNodeStatus::Skipped)
    }
}

/// Why a node was not executed.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, strum::AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SkipReason {
    /// a predecessor failed or was itself skipped for a failure
    UpstreamFailed,
    /// every incoming edge was pruned by a condition
    BranchPruned,
    /// the run was aborted before the node was dispatched
    RunAborted,
}

impl SkipReason {
    pub fn message(&self) -> &'static str {
        match self {
            SkipReason::UpstreamFailed => "skipped: an upstream dependency failed",
            SkipReason::BranchPruned => "skipped: every incoming branch was pruned by a condition",
            SkipReason::RunAborted => "skipped: the run was aborted",
        }
    }
}

/// One node of one run; the audit trail of execution.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct FlowRunNode {
    /// `{run_id}:{node_id}`
    pub id: String,
    pub run_id: String,
    pub node_id: String,
    pub node_type: NodeType,
    /// position of the node in the flow definition
    pub seq: usize,
    pub status: RunNodeStatus,
    pub output: Option<Value>,
    pub error: Option<String>,
    pub skip_reason: Option<SkipReason>,
    pub sparks_spent: u64,
    pub attempts: u32,
    pub started_at: Option<i64>,
    pub finished_at: Option<i64>,
}

impl FlowRunNode {
    pub fn record_id(
        run_id: &str,
        node_id: &str,
    ) -> String {
        format!("{}:{}", run_id, node_id)
    }

    /// A fresh `PENDING` record.
    pub fn pending(
        run_id: &str,
        node_id: &str,
        node_type: NodeType,
        seq: usize,
    ) -> Self {
        Self {
            id: Self::record_id(run_id, node_id),
            run_id: run_id.to_string(),
            node_id: node_id.to_string(),
            node_type,
            seq,
            status: RunNodeStatus::Pending,
            output: None,
            error: None,
            skip_reason: None,
            sparks_spent: 0,
            attempts: 0,
            started_at: None,
            finished_at: None,
        }
    }
}

impl DbCollectionIden for FlowRunNode {
    fn iden() -> StoreIden {
        StoreIden::RunNodes
    }
}
