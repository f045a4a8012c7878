//! # forgeflow
//!
//! forgeflow runs marketing automation flows: directed acyclic graphs of
//! typed nodes (trigger, llm, image, video, brandguard, condition, http,
//! notification) authored in a visual editor.
//!
//! ## Core Features
//!
//! - **Validation**: structural and per-type semantic checks with typed issues
//! - **Scheduling**: one Kahn implementation for ordering and cycle detection
//! - **Spark metering**: an overridable cost table, upfront budget checks and
//!   optional strict checks before each node
//! - **Failure isolation**: a failed node skips only its downstream subgraph;
//!   condition nodes prune branches at run time
//! - **Pluggable executors and storage**: hosts supply AI and notification
//!   providers and a persistence backend
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use forgeflow::{EngineBuilder, FlowDefinition, executors::ExecutorRegistry};
//!
//! let registry = ExecutorRegistry::new().with_llm(llm).with_http();
//! let engine = EngineBuilder::new().registry(registry).build()?;
//! engine.launch()?;
//!
//! let def = FlowDefinition::from_json(json_str)?;
//! let run = engine.execute(&def, remaining_sparks).await?;
//! ```

mod builder;
mod common;
mod config;
mod engine;
mod error;
pub mod events;
pub mod executors;
pub mod flow;
pub mod model;
mod orchestrator;
mod runtime;
pub mod store;
mod utils;

use std::sync::{Arc, RwLock};

pub use builder::EngineBuilder;
pub use config::{Config, StoreConfig, StoreType};
pub use engine::Engine;
pub use error::ForgeError;
pub use executors::{ExecutorInput, ExecutorOutput, NodeExecutor, NodeFailure};
pub use flow::{
    CostTable, FlowDefinition, IssueCategory, IssueCode, IssueType, NodeId, NodeType, ValidationIssue, build_adjacency, build_in_degree, cost, estimate_cost, has_errors,
    topological_order, validate,
};
pub use orchestrator::{RunOptions, RunPlan, SparkMeter};
pub use runtime::{Channel, ChannelEvent, ChannelOptions, Run, RunId};

/// Result type alias for forgeflow operations.
pub type Result<T> = std::result::Result<T, ForgeError>;

/// Thread-safe shared lock wrapper using Arc<RwLock<T>>.
pub(crate) type ShareLock<T> = Arc<RwLock<T>>;
