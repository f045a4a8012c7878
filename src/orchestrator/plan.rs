use tracing::{debug, warn};

use crate::{
    ForgeError, Result,
    executors::ExecutorRegistry,
    flow::{CostTable, FlowDefinition, FlowGraph, NodeId, ValidationIssue, has_errors, order_graph, validate},
    runtime::RunId,
    utils,
};

/// Everything decided about a run before any record of it exists.
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub run_id: RunId,
    pub definition: FlowDefinition,
    pub graph: FlowGraph,
    /// topological execution order
    pub order: Vec<NodeId>,
    pub estimated_sparks: u64,
    /// sparks the caller has left
    pub budget: u64,
    /// warnings the validator raised
    pub warnings: Vec<ValidationIssue>,
}

impl RunPlan {
    /// Check that `def` can run within `budget`.
    ///
    /// Refuses, in this order: a definition with error-level issues, a cyclic
    /// graph, a node type without an executor, and an estimate above
    /// `budget`.
    pub fn prepare(
        def: &FlowDefinition,
        budget: u64,
        registry: &ExecutorRegistry,
        costs: &CostTable,
    ) -> Result<Self> {
        let issues = validate(def);
        if has_errors(&issues) {
            return Err(ForgeError::Invalid(issues));
        }

        let graph = FlowGraph::new(def);
        let order = order_graph(&graph)?;

        let missing = registry.missing_for(def);
        if !missing.is_empty() {
            let names: Vec<&str> = missing.iter().map(|t| t.as_ref()).collect();
            return Err(ForgeError::Executor(format!("no executor registered for node type(s): {}", names.join(", "))));
        }

        let estimated_sparks = costs.total_cost(def);
        if estimated_sparks > budget {
            warn!("flow '{}' needs {} sparks but only {} remain", def.id, estimated_sparks, budget);
            return Err(ForgeError::BudgetExceeded {
                required: estimated_sparks,
                available: budget,
            });
        }

        let run_id = utils::longid();
        debug!("planned run {} of flow '{}': {} node(s), {} sparks estimated", run_id, def.id, order.len(), estimated_sparks);

        Ok(Self {
            run_id,
            definition: def.clone(),
            graph,
            order,
            estimated_sparks,
            budget,
            warnings: issues,
        })
    }
}
