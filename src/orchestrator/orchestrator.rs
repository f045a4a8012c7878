//! Run orchestrator.
//!
//! The orchestrator owns every record of one run and is their only writer.
//! Its loop:
//! - applies run commands (abort)
//! - walks the execution order and gates each pending node whose
//!   predecessors are all terminal: skip it, or dispatch it as a task
//! - applies node task results as they complete
//!
//! A failed node never stops the loop; it only skips the nodes that depend
//! on it.

use std::{
    collections::{BTreeMap, HashMap},
    panic::AssertUnwindSafe,
    sync::Arc,
    time::Duration,
};

use futures::FutureExt;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};

use crate::{
    ForgeError, Result,
    common::{Queue, Shutdown},
    events::{Message, NodeEvent, RunEvent},
    executors::{ExecutorInput, ExecutorOutput, NodeExecutor, NodeFailure},
    flow::NodeId,
    orchestrator::{RunPlan, RunServices, SparkMeter},
    runtime::{RunCommand, RunContext},
    store::data::{FlowRun, FlowRunNode, RunNodeStatus, RunStatus, SkipReason},
    utils,
};

/// Where a node stands inside the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeState {
    Pending,
    Running,
    Succeeded {
        /// condition outcome
        branch: Option<bool>,
    },
    Failed,
    Skipped(SkipReason),
}

impl NodeState {
    fn is_terminal(&self) -> bool {
        !matches!(self, NodeState::Pending | NodeState::Running)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gate {
    Run,
    Skip(SkipReason),
}

/// What a node task hands back to the loop.
struct NodeOutcome {
    node_id: NodeId,
    attempts: u32,
    result: std::result::Result<ExecutorOutput, NodeFailure>,
}

pub(crate) struct Orchestrator {
    plan: RunPlan,
    services: RunServices,
    ctx: RunContext,
    meter: SparkMeter,
    command_queue: Arc<Queue<RunCommand>>,
    /// flipped once the run record is terminal
    done: Arc<Shutdown>,

    run: FlowRun,
    records: HashMap<NodeId, FlowRunNode>,
    states: HashMap<NodeId, NodeState>,
    /// dispatched node -> sparks reserved for it
    in_flight: HashMap<NodeId, u64>,
    abort_reason: Option<String>,
}

impl Orchestrator {
    /// Persist the `PENDING` run and its node records.
    ///
    /// The node records are written in one batch before the run record, so
    /// a run is never visible with part of its nodes.
    pub(crate) fn new(
        plan: RunPlan,
        services: RunServices,
        command_queue: Arc<Queue<RunCommand>>,
        done: Arc<Shutdown>,
    ) -> Result<Self> {
        let def = &plan.definition;
        let run = FlowRun {
            id: plan.run_id.clone(),
            flow_id: def.id.clone(),
            status: RunStatus::Pending,
            budget: plan.budget,
            estimated_sparks: plan.estimated_sparks,
            total_sparks_spent: 0,
            started_at: utils::time::time_millis(),
            finished_at: None,
            error: None,
        };
        let records: Vec<FlowRunNode> = def.nodes.iter().enumerate().map(|(seq, node)| FlowRunNode::pending(&run.id, &node.id, node.node_type(), seq)).collect();

        let run_nodes = services.store.run_nodes()?;
        run_nodes.create_many(&records)?;
        if let Err(err) = services.store.runs()?.create(&run) {
            for record in records.iter() {
                let _ = run_nodes.delete(&record.id);
            }
            return Err(err);
        }
        debug!("run {} created with {} node record(s)", run.id, records.len());

        let ctx = RunContext::new(run.id.clone(), def.env.clone(), def.nodes.len(), services.channel.clone());
        let meter = SparkMeter::new(plan.budget);

        Ok(Self {
            records: records.into_iter().map(|r| (r.node_id.clone(), r)).collect(),
            states: HashMap::new(),
            in_flight: HashMap::new(),
            abort_reason: None,
            plan,
            services,
            ctx,
            meter,
            command_queue,
            done,
            run,
        })
    }

    pub(crate) fn run_id(&self) -> &str {
        &self.run.id
    }

    pub(crate) fn flow_id(&self) -> &str {
        &self.run.flow_id
    }

    /// Drive the run to a terminal state and return its final record.
    pub(crate) async fn run(mut self) -> Result<FlowRun> {
        let done = self.done.clone();
        let result = self.drive().await;

        if let Err(err) = &result {
            error!("run {} stopped: {}", self.run.id, err);
            self.ctx.cancel();
            self.run.status = RunStatus::Failed;
            self.run.error = Some(err.to_string());
            self.run.total_sparks_spent = self.meter.spent();
            self.run.finished_at = Some(utils::time::time_millis());
            let _ = self.save_run();
            self.ctx.emit(Message::run(
                &self.run.id,
                RunEvent::Failed {
                    error: err.to_string(),
                    total_sparks_spent: self.run.total_sparks_spent,
                },
            ));
        }

        done.shutdown();
        result
    }

    async fn drive(&mut self) -> Result<FlowRun> {
        self.start()?;

        let mut tasks = JoinSet::new();
        let command_queue = self.command_queue.clone();
        loop {
            while let Some(cmd) = command_queue.try_next() {
                self.apply(cmd);
            }
            if self.abort_reason.is_none() {
                self.dispatch_ready(&mut tasks)?;
            }
            if tasks.is_empty() {
                break;
            }

            tokio::select! {
                Some(cmd) = command_queue.next_async() => self.apply(cmd),
                Some(joined) = tasks.join_next() => self.complete(joined)?,
                else => break,
            }
        }

        self.finish()
    }

    fn start(&mut self) -> Result<()> {
        for issue in self.plan.warnings.iter() {
            debug!("run {}: {}", self.run.id, issue.message);
        }

        self.run.status = RunStatus::Running;
        self.run.started_at = utils::time::time_millis();
        self.save_run()?;

        info!("run {} of flow '{}' started", self.run.id, self.run.flow_id);
        self.ctx.emit(Message::run(
            &self.run.id,
            RunEvent::Started {
                flow_id: self.run.flow_id.clone(),
                node_ids: self.plan.order.clone(),
            },
        ));
        Ok(())
    }

    fn apply(
        &mut self,
        cmd: RunCommand,
    ) {
        match cmd {
            RunCommand::Abort(reason) => self.request_abort(reason),
        }
    }

    fn request_abort(
        &mut self,
        reason: String,
    ) {
        if self.abort_reason.is_some() {
            return;
        }
        warn!("run {} aborting: {}", self.run.id, reason);
        self.ctx.cancel();
        self.abort_reason = Some(reason);
    }

    /// Gate every pending node whose predecessors are terminal, in execution
    /// order, until the concurrency limit is reached.
    fn dispatch_ready(
        &mut self,
        tasks: &mut JoinSet<NodeOutcome>,
    ) -> Result<()> {
        for idx in 0..self.plan.order.len() {
            if self.abort_reason.is_some() {
                break;
            }
            let node_id = self.plan.order[idx].clone();
            if self.state(&node_id) != NodeState::Pending || !self.predecessors_settled(&node_id) {
                continue;
            }

            match self.gate(&node_id) {
                Gate::Skip(reason) => self.skip(&node_id, reason)?,
                Gate::Run if tasks.len() < self.services.options.max_concurrency => self.dispatch(&node_id, tasks)?,
                Gate::Run => {}
            }
        }
        Ok(())
    }

    fn predecessors_settled(
        &self,
        node_id: &str,
    ) -> bool {
        self.plan.graph.predecessors(node_id).iter().all(|p| self.state(p).is_terminal())
    }

    /// Decide whether a node whose predecessors are terminal runs.
    ///
    /// A failed source, or one skipped because of a failure, skips the node.
    /// Otherwise the node runs when at least one incoming edge is live.
    fn gate(
        &self,
        node_id: &str,
    ) -> Gate {
        let incoming = self.plan.graph.incoming_edges(node_id);
        if incoming.is_empty() {
            return Gate::Run;
        }

        let failed_upstream = incoming.iter().any(|edge| matches!(self.state(&edge.source), NodeState::Failed | NodeState::Skipped(SkipReason::UpstreamFailed)));
        if failed_upstream {
            return Gate::Skip(SkipReason::UpstreamFailed);
        }

        let live = incoming.iter().any(|edge| match self.state(&edge.source) {
            NodeState::Succeeded {
                branch: Some(outcome),
            } => edge.source_handle.accepts(outcome),
            NodeState::Succeeded {
                branch: None,
            } => true,
            _ => false,
        });
        if live { Gate::Run } else { Gate::Skip(SkipReason::BranchPruned) }
    }

    fn dispatch(
        &mut self,
        node_id: &NodeId,
        tasks: &mut JoinSet<NodeOutcome>,
    ) -> Result<()> {
        let node = self.plan.definition.node(node_id).cloned().ok_or_else(|| ForgeError::Run(format!("node '{}' is not part of flow '{}'", node_id, self.run.flow_id)))?;

        let price = self.services.costs.cost(node.node_type());
        let reserved = if self.services.options.strict_budget {
            if !self.meter.try_reserve(price) {
                let reason = format!("insufficient sparks to run node '{}': needs {}, {} remaining", node_id, price, self.meter.remaining());
                self.request_abort(reason);
                return Ok(());
            }
            price
        } else {
            0
        };

        let started_at = utils::time::time_millis();
        self.save_node(node_id, |record| {
            record.status = RunNodeStatus::Running;
            record.started_at = Some(started_at);
        })?;
        self.states.insert(node_id.clone(), NodeState::Running);
        info!("run {}: node '{}' ({}) running", self.run.id, node_id, node.node_type());
        self.ctx.emit(Message::node(&self.run.id, node_id, NodeEvent::Running(started_at)));

        let upstream = self.upstream_of(node_id);
        let input = ExecutorInput {
            run_id: self.run.id.clone(),
            node,
            upstream,
            env: self.ctx.env().clone(),
        };
        let executor = self.services.registry.get(input.node.node_type());
        tasks.spawn(execute_node(self.ctx.clone(), executor, input));
        self.in_flight.insert(node_id.clone(), reserved);
        Ok(())
    }

    /// Outputs of the node's succeeded predecessors.
    fn upstream_of(
        &self,
        node_id: &str,
    ) -> BTreeMap<NodeId, serde_json::Value> {
        let predecessors = self.plan.graph.predecessors(node_id);
        self.ctx.outputs_of(predecessors.iter().filter(|p| matches!(self.state(p), NodeState::Succeeded { .. })))
    }

    fn complete(
        &mut self,
        joined: std::result::Result<NodeOutcome, JoinError>,
    ) -> Result<()> {
        let outcome = joined.map_err(|err| ForgeError::Runtime(format!("run {}: node task ended abnormally: {}", self.run.id, err)))?;
        let reserved = self.in_flight.remove(&outcome.node_id).unwrap_or(0);
        self.meter.release(reserved);

        match outcome.result {
            Ok(output) => self.succeed(&outcome.node_id, outcome.attempts, output),
            Err(failure) => self.fail(&outcome.node_id, outcome.attempts, failure),
        }
    }

    fn succeed(
        &mut self,
        node_id: &NodeId,
        attempts: u32,
        output: ExecutorOutput,
    ) -> Result<()> {
        let record = self.record(node_id)?;
        let node_type = record.node_type;
        let elapsed = record.started_at.map(utils::time::elapsed_millis).unwrap_or(0);
        let sparks = output.sparks.unwrap_or_else(|| self.services.costs.cost(node_type));
        let total = self.meter.charge(sparks);
        let finished_at = utils::time::time_millis();

        self.ctx.add_output(node_id.clone(), output.value.clone());
        self.save_node(node_id, |record| {
            record.status = RunNodeStatus::Succeeded;
            record.output = Some(output.value);
            record.sparks_spent = sparks;
            record.attempts = attempts;
            record.finished_at = Some(finished_at);
        })?;
        self.states.insert(
            node_id.clone(),
            NodeState::Succeeded {
                branch: output.branch,
            },
        );

        self.run.total_sparks_spent = total;
        self.save_run()?;

        info!("run {}: node '{}' succeeded in {} ms, {} sparks", self.run.id, node_id, elapsed, sparks);
        self.ctx.emit(Message::node(
            &self.run.id,
            node_id,
            NodeEvent::Succeeded {
                sparks,
            },
        ));
        Ok(())
    }

    fn fail(
        &mut self,
        node_id: &NodeId,
        attempts: u32,
        failure: NodeFailure,
    ) -> Result<()> {
        let message = failure.to_string();
        let finished_at = utils::time::time_millis();

        self.save_node(node_id, |record| {
            record.status = RunNodeStatus::Failed;
            record.error = Some(message.clone());
            record.attempts = attempts;
            record.finished_at = Some(finished_at);
        })?;
        self.states.insert(node_id.clone(), NodeState::Failed);

        warn!("run {}: node '{}' failed after {} attempt(s): {}", self.run.id, node_id, attempts, message);
        self.ctx.emit(Message::node(&self.run.id, node_id, NodeEvent::Failed(message)));
        Ok(())
    }

    fn skip(
        &mut self,
        node_id: &NodeId,
        reason: SkipReason,
    ) -> Result<()> {
        let finished_at = utils::time::time_millis();
        self.save_node(node_id, |record| {
            record.status = RunNodeStatus::Skipped;
            record.skip_reason = Some(reason);
            record.error = Some(reason.message().to_string());
            record.finished_at = Some(finished_at);
        })?;
        self.states.insert(node_id.clone(), NodeState::Skipped(reason));

        warn!("run {}: node '{}' {}", self.run.id, node_id, reason.message());
        self.ctx.emit(Message::node(&self.run.id, node_id, NodeEvent::Skipped(reason)));
        Ok(())
    }

    fn finish(&mut self) -> Result<FlowRun> {
        let event = match self.abort_reason.clone() {
            Some(reason) => {
                for idx in 0..self.plan.order.len() {
                    let node_id = self.plan.order[idx].clone();
                    if self.state(&node_id) == NodeState::Pending {
                        self.skip(&node_id, SkipReason::RunAborted)?;
                    }
                }
                self.run.status = RunStatus::Aborted;
                self.run.error = Some(reason.clone());
                RunEvent::Aborted {
                    reason,
                    total_sparks_spent: self.meter.spent(),
                }
            }
            None => {
                let failed: Vec<NodeId> = self
                    .plan
                    .order
                    .iter()
                    .filter(|id| self.state(id) == NodeState::Failed)
                    .filter(|id| self.plan.definition.node(id).is_some_and(|n| !n.optional))
                    .cloned()
                    .collect();

                if failed.is_empty() {
                    self.run.status = RunStatus::Succeeded;
                    RunEvent::Succeeded {
                        total_sparks_spent: self.meter.spent(),
                    }
                } else {
                    let error = format!("node(s) failed: {}", failed.join(", "));
                    self.run.status = RunStatus::Failed;
                    self.run.error = Some(error.clone());
                    RunEvent::Failed {
                        error,
                        total_sparks_spent: self.meter.spent(),
                    }
                }
            }
        };

        self.run.total_sparks_spent = self.meter.spent();
        self.run.finished_at = Some(utils::time::time_millis());
        self.save_run()?;

        info!("run {} finished {}, {} of {} sparks spent", self.run.id, self.run.status, self.run.total_sparks_spent, self.run.estimated_sparks);
        self.ctx.emit(Message::run(&self.run.id, event));
        Ok(self.run.clone())
    }

    fn state(
        &self,
        node_id: &str,
    ) -> NodeState {
        self.states.get(node_id).copied().unwrap_or(NodeState::Pending)
    }

    fn record(
        &self,
        node_id: &str,
    ) -> Result<&FlowRunNode> {
        self.records.get(node_id).ok_or_else(|| ForgeError::Run(format!("run {} has no record for node '{}'", self.run.id, node_id)))
    }

    fn save_node(
        &mut self,
        node_id: &str,
        change: impl FnOnce(&mut FlowRunNode),
    ) -> Result<()> {
        let run_id = self.run.id.clone();
        let record = self.records.get_mut(node_id).ok_or_else(|| ForgeError::Run(format!("run {} has no record for node '{}'", run_id, node_id)))?;
        change(record);
        self.services
            .store
            .run_nodes()?
            .update(record)
            .inspect_err(|err| error!("run {}: failed to save node '{}': {}", run_id, node_id, err))?;
        Ok(())
    }

    fn save_run(&self) -> Result<()> {
        self.services.store.runs()?.update(&self.run).inspect_err(|err| error!("run {}: failed to save run: {}", self.run.id, err))?;
        Ok(())
    }
}

/// Run one node, retrying retryable failures per its retry policy.
///
/// Each attempt is bounded by the node timeout. No retry starts once the run
/// is aborted.
async fn execute_node(
    ctx: RunContext,
    executor: Option<Arc<dyn NodeExecutor>>,
    input: ExecutorInput,
) -> NodeOutcome {
    let node_id = input.node.id.clone();
    let Some(executor) = executor else {
        return NodeOutcome {
            node_id,
            attempts: 1,
            result: Err(NodeFailure::NoExecutor(input.node.node_type())),
        };
    };

    let max_attempts = input.node.retry.map(|r| r.times).unwrap_or(0).saturating_add(1);
    let interval = input.node.retry.map(|r| r.interval).unwrap_or(0);
    let timeout = input.node.timeout;

    let mut attempt = 0;
    loop {
        attempt += 1;
        let attempt_fut = AssertUnwindSafe(executor.execute(input.clone())).catch_unwind();
        let result = match timeout {
            Some(limit) => match tokio::time::timeout(limit, attempt_fut).await {
                Ok(result) => result,
                Err(_) => Ok(Err(NodeFailure::Timeout(limit.as_millis() as u64))),
            },
            None => attempt_fut.await,
        }
        .unwrap_or_else(|_| Err(NodeFailure::Failed("executor panicked".to_string())));

        match result {
            Err(failure) if failure.is_retryable() && attempt < max_attempts && !ctx.is_cancelled() => {
                debug!("run {}: node '{}' attempt {} failed: {}", ctx.run_id(), node_id, attempt, failure);
                ctx.emit(Message::node(
                    ctx.run_id(),
                    &node_id,
                    NodeEvent::Retry {
                        attempt,
                        error: failure.to_string(),
                    },
                ));
                if interval > 0 {
                    tokio::select! {
                        _ = ctx.cancelled() => {
                            return NodeOutcome {
                                node_id,
                                attempts: attempt,
                                result: Err(failure),
                            };
                        }
                        _ = tokio::time::sleep(Duration::from_millis(interval)) => {}
                    }
                }
            }
            result => {
                return NodeOutcome {
                    node_id,
                    attempts: attempt,
                    result,
                };
            }
        }
    }
}
