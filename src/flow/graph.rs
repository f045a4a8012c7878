//! Graph index over a flow definition.
//!
//! [`FlowGraph`] is built once per definition and answers every adjacency
//! question the validator, scheduler and orchestrator ask, so none of them
//! rescan the edge list.

use std::collections::{HashMap, HashSet, VecDeque};

use petgraph::{
    Direction,
    graph::{DiGraph, NodeIndex},
    visit::EdgeRef,
};

use crate::flow::{FlowDefinition, FlowEdge, NodeId};

#[derive(Debug, Clone)]
pub struct FlowGraph {
    /// Node weights are ids, edge weights the edges themselves.
    graph: DiGraph<NodeId, FlowEdge>,
    /// id -> graph index
    index: HashMap<NodeId, NodeIndex>,
}

impl FlowGraph {
    /// Index `def`.
    ///
    /// A duplicated node id keeps its first occurrence and an edge with an
    /// unknown endpoint is left out; the validator reports both.
    pub fn new(def: &FlowDefinition) -> Self {
        let mut graph = DiGraph::with_capacity(def.nodes.len(), def.edges.len());
        let mut index = HashMap::with_capacity(def.nodes.len());

        for node in def.nodes.iter() {
            if index.contains_key(&node.id) {
                continue;
            }
            let idx = graph.add_node(node.id.clone());
            index.insert(node.id.clone(), idx);
        }

        for edge in def.edges.iter() {
            if let (Some(source), Some(target)) = (index.get(&edge.source), index.get(&edge.target)) {
                graph.add_edge(*source, *target, edge.clone());
            }
        }

        Self {
            graph,
            index,
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn contains(
        &self,
        id: &str,
    ) -> bool {
        self.index.contains_key(id)
    }

    /// Node ids in definition order.
    pub fn node_ids(&self) -> impl Iterator<Item = &NodeId> {
        self.graph.node_indices().map(|idx| &self.graph[idx])
    }

    /// Edges leaving `id`, in definition order.
    pub fn outgoing_edges(
        &self,
        id: &str,
    ) -> Vec<&FlowEdge> {
        self.edges(id, Direction::Outgoing)
    }

    /// Edges entering `id`, in definition order.
    pub fn incoming_edges(
        &self,
        id: &str,
    ) -> Vec<&FlowEdge> {
        self.edges(id, Direction::Incoming)
    }

    pub fn successors(
        &self,
        id: &str,
    ) -> Vec<NodeId> {
        self.outgoing_edges(id).into_iter().map(|e| e.target.clone()).collect()
    }

    pub fn predecessors(
        &self,
        id: &str,
    ) -> Vec<NodeId> {
        self.incoming_edges(id).into_iter().map(|e| e.source.clone()).collect()
    }

    pub fn in_degree(
        &self,
        id: &str,
    ) -> usize {
        self.index.get(id).map(|idx| self.graph.edges_directed(*idx, Direction::Incoming).count()).unwrap_or(0)
    }

    /// Every node reachable from `roots`, roots included.
    pub fn reachable_from<'a>(
        &self,
        roots: impl IntoIterator<Item = &'a str>,
    ) -> HashSet<NodeId> {
        let mut reachable = HashSet::new();
        let mut queue = VecDeque::new();

        for root in roots {
            if let Some(idx) = self.index.get(root) {
                if reachable.insert(self.graph[*idx].clone()) {
                    queue.push_back(*idx);
                }
            }
        }

        while let Some(current) = queue.pop_front() {
            for next in self.graph.neighbors_directed(current, Direction::Outgoing) {
                if reachable.insert(self.graph[next].clone()) {
                    queue.push_back(next);
                }
            }
        }

        reachable
    }

    /// Kahn's algorithm over the whole graph with a FIFO ready queue.
    ///
    /// Nodes still carrying a positive in-degree once the queue drains sit on
    /// (or behind) a cycle and are returned as `blocked`.
    pub(crate) fn kahn(&self) -> KahnOutcome {
        let mut in_degree: Vec<usize> = self.graph.node_indices().map(|idx| self.graph.edges_directed(idx, Direction::Incoming).count()).collect();

        let mut queue: VecDeque<NodeIndex> = self.graph.node_indices().filter(|idx| in_degree[idx.index()] == 0).collect();
        let mut order = Vec::with_capacity(self.graph.node_count());

        while let Some(idx) = queue.pop_front() {
            order.push(self.graph[idx].clone());
            for target in self.targets_in_order(idx) {
                let degree = &mut in_degree[target.index()];
                *degree -= 1;
                if *degree == 0 {
                    queue.push_back(target);
                }
            }
        }

        let blocked = self.graph.node_indices().filter(|idx| in_degree[idx.index()] > 0).map(|idx| self.graph[idx].clone()).collect();

        KahnOutcome {
            order,
            blocked,
        }
    }

    fn edges(
        &self,
        id: &str,
        direction: Direction,
    ) -> Vec<&FlowEdge> {
        let Some(idx) = self.index.get(id) else {
            return Vec::new();
        };
        // petgraph walks the newest edge first
        let mut edges: Vec<&FlowEdge> = self.graph.edges_directed(*idx, direction).map(|e| e.weight()).collect();
        edges.reverse();
        edges
    }

    fn targets_in_order(
        &self,
        idx: NodeIndex,
    ) -> Vec<NodeIndex> {
        let mut targets: Vec<NodeIndex> = self.graph.edges_directed(idx, Direction::Outgoing).map(|e| e.target()).collect();
        targets.reverse();
        targets
    }
}

/// Result of one pass of Kahn's algorithm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct KahnOutcome {
    pub order: Vec<NodeId>,
    pub blocked: Vec<NodeId>,
}

/// Successor list for every node, isolated nodes included.
pub fn build_adjacency(def: &FlowDefinition) -> HashMap<NodeId, Vec<NodeId>> {
    let graph = FlowGraph::new(def);
    graph.node_ids().map(|id| (id.clone(), graph.successors(id))).collect()
}

/// Incoming edge count for every node, isolated nodes included.
pub fn build_in_degree(def: &FlowDefinition) -> HashMap<NodeId, usize> {
    let graph = FlowGraph::new(def);
    graph.node_ids().map(|id| (id.clone(), graph.in_degree(id))).collect()
}
