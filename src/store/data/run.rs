use serde::{Deserialize, Serialize};

use crate::store::{DbCollectionIden, StoreIden};

/// `PENDING -> RUNNING -> {SUCCEEDED | FAILED | ABORTED}`
#[derive(Deserialize, Serialize, Debug, Clone, Copy, Default, PartialEq, Eq, strum::AsRefStr, strum::Display, strum::EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    #[default]
    Pending,
    Running,
    Succeeded,
    Failed,
    Aborted,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Succeeded | RunStatus::Failed | RunStatus::Aborted)
    }
}

/// One execution of a flow.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct FlowRun {
    pub id: String,
    pub flow_id: String,
    pub status: RunStatus,
    /// sparks available when the run was planned
    pub budget: u64,
    /// cost table price of every node
    pub estimated_sparks: u64,
    pub total_sparks_spent: u64,
    pub started_at: i64,
    pub finished_at: Option<i64>,
    /// why the run failed or was aborted
    pub error: Option<String>,
}

impl DbCollectionIden for FlowRun {
    fn iden() -> StoreIden {
        StoreIden::Runs
    }
}
