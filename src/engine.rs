//! Flow engine - the main entry point for forgeflow.
//!
//! The engine ties the pure flow operations to execution:
//! - validating and deploying flow definitions
//! - planning runs against a sparks budget and starting them
//! - tracking live runs so they can be aborted
//! - publishing run events on the channel

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use tracing::{debug, info};

use crate::{
    Config, ForgeError, Result,
    common::{MemCache, Queue, Shutdown},
    executors::ExecutorRegistry,
    flow::{CostTable, FlowDefinition, ValidationIssue, validate},
    orchestrator::{RunOptions, RunPlan, RunServices},
    runtime::{Channel, ChannelEvent, ChannelOptions, Run, RunId},
    store::{
        DbStore, Store,
        data::{FlowRun, FlowRunNode},
    },
};

/// Maximum number of live runs kept for lookup.
const RUN_CACHE_SIZE: usize = 2048;
/// Size of the queue of finished run ids.
const RUN_FINISHED_QUEUE_SIZE: usize = 100;

/// The flow engine.
///
/// # Example
///
/// ```rust,ignore
/// let engine = EngineBuilder::new().registry(registry).build()?;
/// engine.launch()?;
///
/// let run = engine.execute(&definition, remaining_sparks).await?;
/// for node in engine.run_nodes(&run.id)? {
///     println!("{} {}", node.node_id, node.status);
/// }
///
/// engine.shutdown();
/// ```
pub struct Engine {
    /// Event channel for run and node events.
    channel: Arc<Channel>,
    /// Flows, runs and run nodes.
    store: Arc<Store>,
    registry: Arc<ExecutorRegistry>,
    costs: Arc<CostTable>,
    options: RunOptions,
    /// Ids of runs that reached a terminal state.
    runs_finished_queue: Arc<Queue<RunId>>,
    /// Live runs by id.
    runs: Arc<MemCache<RunId, Arc<Run>>>,

    running: Arc<AtomicBool>,
    shutdown: Arc<Shutdown>,
}

impl Engine {
    pub(crate) fn new(
        config: Config,
        registry: ExecutorRegistry,
        backend: &dyn DbStore,
    ) -> Result<Self> {
        let store = Store::new();
        backend.init(&store)?;

        Ok(Self {
            channel: Arc::new(Channel::new()),
            store: Arc::new(store),
            registry: Arc::new(registry),
            options: config.run_options(),
            costs: Arc::new(config.costs),
            runs_finished_queue: Queue::new(RUN_FINISHED_QUEUE_SIZE),
            runs: Arc::new(MemCache::new(RUN_CACHE_SIZE)),
            running: Arc::new(AtomicBool::new(false)),
            shutdown: Arc::new(Shutdown::new()),
        })
    }

    /// Starts the event channel and the cleanup of finished runs.
    ///
    /// Must be called from within a tokio runtime. Calling it again is a
    /// no-op. An engine that was shut down cannot be launched again.
    pub fn launch(&self) -> Result<()> {
        if self.shutdown.is_terminated() {
            return Err(ForgeError::Engine("engine was shut down".to_string()));
        }
        if self.running.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        // register before listening so no event is missed
        let runs_finished_queue = self.runs_finished_queue.clone();
        ChannelEvent::channel(self.channel.clone(), ChannelOptions::default())?.on_finish(move |run_id| {
            let _ = runs_finished_queue.send(run_id);
        });
        self.channel.listen();

        let runs_finished_queue = self.runs_finished_queue.clone();
        let shutdown = self.shutdown.clone();
        let runs = self.runs.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.wait() => break,
                    Some(run_id) = runs_finished_queue.next_async() => {
                        runs.remove(&run_id);
                    }
                }
            }
        });

        info!("engine launched");
        Ok(())
    }

    /// Aborts every live run and stops the channel.
    pub fn shutdown(&self) {
        if !self.running.swap(false, Ordering::AcqRel) {
            return;
        }

        self.shutdown.shutdown();
        for (_, run) in self.runs.snapshot() {
            let _ = run.abort_with("engine shut down");
        }
        self.channel.shutdown();
        info!("engine shut down");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Validation issues of `def`; see [`crate::validate`].
    pub fn validate(
        &self,
        def: &FlowDefinition,
    ) -> Vec<ValidationIssue> {
        validate(def)
    }

    /// Stores `def` so it can be run by id with [`Engine::execute_flow`].
    pub fn deploy(
        &self,
        def: &FlowDefinition,
    ) -> Result<bool> {
        self.store.deploy(def)
    }

    /// Plans a run of `def` and persists its `PENDING` records.
    ///
    /// Nothing is persisted when the flow is invalid, cyclic, uses a node
    /// type without an executor or costs more than `budget`.
    pub fn build_run(
        &self,
        def: &FlowDefinition,
        budget: u64,
    ) -> Result<Arc<Run>> {
        self.ensure_running()?;

        let plan = RunPlan::prepare(def, budget, &self.registry, &self.costs)?;
        let run = Run::new(plan, self.services())?;
        self.runs.set(run.id().to_string(), run.clone());

        debug!("built run {} of flow '{}'", run.id(), run.flow_id());
        Ok(run)
    }

    /// Starts executing a built run and returns its id.
    pub fn start_run(
        &self,
        run: &Arc<Run>,
    ) -> Result<RunId> {
        self.ensure_running()?;
        run.start()?;
        Ok(run.id().to_string())
    }

    /// Plans, runs and awaits `def`, returning the final run record.
    ///
    /// Node failures are recorded on the run, not returned; only planning
    /// and persistence errors are.
    pub async fn execute(
        &self,
        def: &FlowDefinition,
        budget: u64,
    ) -> Result<FlowRun> {
        let run = self.build_run(def, budget)?;
        self.start_run(&run)?;
        run.wait().await
    }

    /// [`Engine::execute`] on a deployed flow.
    pub async fn execute_flow(
        &self,
        flow_id: &str,
        budget: u64,
    ) -> Result<FlowRun> {
        let def = self.store.flows()?.find(flow_id)?.definition()?;
        self.execute(&def, budget).await
    }

    /// Asks a live run to stop.
    pub fn abort(
        &self,
        run_id: &str,
    ) -> Result<()> {
        match self.runs.get(&run_id.to_string()) {
            Some(run) if !run.is_complete() => run.abort(),
            _ => Err(ForgeError::Run(format!("run {} is not running", run_id))),
        }
    }

    /// A live run, if it has not finished yet.
    pub fn live_run(
        &self,
        run_id: &str,
    ) -> Option<Arc<Run>> {
        self.runs.get(&run_id.to_string())
    }

    pub fn get_run(
        &self,
        run_id: &str,
    ) -> Result<FlowRun> {
        self.store.runs()?.find(run_id)
    }

    /// Node records of a run, in definition order.
    pub fn run_nodes(
        &self,
        run_id: &str,
    ) -> Result<Vec<FlowRunNode>> {
        self.store.run_nodes_of(run_id)
    }

    pub fn store(&self) -> Arc<Store> {
        self.store.clone()
    }

    /// Returns a reference to the event channel.
    pub fn channel(&self) -> Arc<Channel> {
        self.channel.clone()
    }

    fn ensure_running(&self) -> Result<()> {
        if !self.is_running() {
            return Err(ForgeError::Engine("engine is not running".to_string()));
        }
        Ok(())
    }

    fn services(&self) -> RunServices {
        RunServices {
            registry: self.registry.clone(),
            costs: self.costs.clone(),
            store: self.store.clone(),
            channel: self.channel.clone(),
            options: self.options,
        }
    }
}
