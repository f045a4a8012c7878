//! Run orchestration: planning, spark metering and the run loop.

mod meter;
#[allow(clippy::module_inception)]
mod orchestrator;
mod plan;

use std::sync::Arc;

use crate::{executors::ExecutorRegistry, flow::CostTable, runtime::Channel, store::Store};

pub use meter::SparkMeter;
pub(crate) use orchestrator::Orchestrator;
pub use plan::RunPlan;

/// Execution policy shared by every run of an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// ready nodes executed at the same time; 1 runs the topological order
    /// one node after the other
    pub max_concurrency: usize,
    /// re-check the remaining sparks before each dispatch and abort the run
    /// when they do not cover the next node
    pub strict_budget: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            max_concurrency: 1,
            strict_budget: false,
        }
    }
}

/// Collaborators a run needs.
#[derive(Clone)]
pub(crate) struct RunServices {
    pub registry: Arc<ExecutorRegistry>,
    pub costs: Arc<CostTable>,
    pub store: Arc<Store>,
    pub channel: Arc<Channel>,
    pub options: RunOptions,
}
