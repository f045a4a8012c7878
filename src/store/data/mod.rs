mod flow;
mod run;
mod run_node;

pub use flow::FlowRecord;
pub use run::{FlowRun, RunStatus};
pub use run_node::{FlowRunNode, RunNodeStatus, SkipReason};
