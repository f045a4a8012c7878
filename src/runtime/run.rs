use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::{
    ForgeError, Result,
    common::{Queue, Shutdown},
    orchestrator::{Orchestrator, RunPlan, RunServices},
    store::{
        Store,
        data::{FlowRun, FlowRunNode},
    },
};

const COMMAND_QUEUE_SIZE: usize = 100;

pub type RunId = String;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunCommand {
    /// stop dispatching; carries the reason recorded on the run
    Abort(String),
}

/// Handle on one run.
///
/// Created by [`Engine::build_run`](crate::Engine::build_run) with its
/// records already persisted as `PENDING`; nothing executes until
/// [`Engine::start_run`](crate::Engine::start_run).
pub struct Run {
    id: RunId,
    flow_id: String,
    estimated_sparks: u64,
    command_queue: Arc<Queue<RunCommand>>,
    orchestrator: Mutex<Option<Orchestrator>>,
    done: Arc<Shutdown>,
    store: Arc<Store>,
}

impl Run {
    pub(crate) fn new(
        plan: RunPlan,
        services: RunServices,
    ) -> Result<Arc<Self>> {
        let store = services.store.clone();
        let estimated_sparks = plan.estimated_sparks;
        let command_queue = Queue::new(COMMAND_QUEUE_SIZE);
        let done = Arc::new(Shutdown::new());

        let orchestrator = Orchestrator::new(plan, services, command_queue.clone(), done.clone())?;

        Ok(Arc::new(Self {
            id: orchestrator.run_id().to_string(),
            flow_id: orchestrator.flow_id().to_string(),
            estimated_sparks,
            command_queue,
            orchestrator: Mutex::new(Some(orchestrator)),
            done,
            store,
        }))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn flow_id(&self) -> &str {
        &self.flow_id
    }

    pub fn estimated_sparks(&self) -> u64 {
        self.estimated_sparks
    }

    /// Spawn the orchestrator loop on the current tokio runtime.
    pub(crate) fn start(&self) -> Result<()> {
        let orchestrator = self
            .orchestrator
            .lock()
            .map_err(|e| ForgeError::Run(e.to_string()))?
            .take()
            .ok_or_else(|| ForgeError::Run(format!("run {} was already started", self.id)))?;

        debug!("starting run {}", self.id);
        tokio::spawn(orchestrator.run());
        Ok(())
    }

    /// Ask the run to stop.
    ///
    /// Nodes already executing finish and are recorded; nothing else is
    /// dispatched and the run ends `ABORTED`.
    pub fn abort(&self) -> Result<()> {
        self.abort_with("aborted by request")
    }

    pub(crate) fn abort_with(
        &self,
        reason: &str,
    ) -> Result<()> {
        self.command_queue.send(RunCommand::Abort(reason.to_string()))
    }

    pub fn is_complete(&self) -> bool {
        self.done.is_terminated()
    }

    /// Wait for the run to end and return its final record.
    pub async fn wait(&self) -> Result<FlowRun> {
        self.done.wait().await;
        self.record()
    }

    /// Current run record.
    pub fn record(&self) -> Result<FlowRun> {
        self.store.runs()?.find(&self.id)
    }

    /// Current node records, in definition order.
    pub fn nodes(&self) -> Result<Vec<FlowRunNode>> {
        self.store.run_nodes_of(&self.id)
    }
}
