//! Typed flow graph and the pure operations over it.

pub mod config;
mod cost;
mod definition;
mod edge;
mod graph;
mod node;
mod scheduler;
pub mod template;
mod validator;

pub use cost::{CostTable, cost, estimate_cost};
pub use definition::FlowDefinition;
pub use edge::{EdgeId, FlowEdge, SourceHandle};
pub use graph::{FlowGraph, build_adjacency, build_in_degree};
pub use node::{FlowNode, NodeId, NodeKind, NodeType};
pub use scheduler::topological_order;
pub(crate) use scheduler::order_graph;
pub use validator::{IssueCategory, IssueCode, IssueType, ValidationIssue, has_errors, validate};
