//! Error types for forgeflow.
//!
//! Every fallible operation of the engine returns [`ForgeError`]. Per-node
//! execution problems are a separate type ([`crate::NodeFailure`]) because
//! they are recorded on the run instead of being returned to the caller.

use std::io::ErrorKind;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::flow::{NodeId, ValidationIssue};

/// Unified error type for all forgeflow operations.
#[derive(Deserialize, Serialize, Error, Debug, Clone, PartialEq)]
pub enum ForgeError {
    /// Engine lifecycle errors (not launched, already shut down).
    #[error("{0}")]
    Engine(String),

    /// Configuration parsing or validation errors.
    #[error("{0}")]
    Config(String),

    /// Data conversion errors (JSON, TOML).
    #[error("{0}")]
    Convert(String),

    /// Flow definition parsing errors.
    #[error("{0}")]
    Flow(String),

    /// Node definition errors.
    #[error("{0}")]
    Node(String),

    /// The flow failed structural or semantic validation.
    #[error("flow is invalid: {}", summarize(.0))]
    Invalid(Vec<ValidationIssue>),

    /// No topological order exists; carries the nodes left unordered.
    #[error("flow contains a cycle involving node(s): {}", .0.join(", "))]
    Cycle(Vec<NodeId>),

    /// The estimated cost of the run exceeds the caller's remaining sparks.
    #[error("estimated cost of {required} sparks exceeds the remaining budget of {available} sparks")]
    BudgetExceeded {
        required: u64,
        available: u64,
    },

    /// Executor registry errors.
    #[error("{0}")]
    Executor(String),

    /// Run lifecycle errors.
    #[error("{0}")]
    Run(String),

    /// Runtime errors (template resolution, task joins).
    #[error("{0}")]
    Runtime(String),

    /// Storage operation errors.
    #[error("{0}")]
    Store(String),

    /// Message queue errors.
    #[error("{0}")]
    Queue(String),

    /// I/O operation errors.
    #[error("{0}")]
    IoError(String),
}

fn summarize(issues: &[ValidationIssue]) -> String {
    issues.iter().filter(|i| i.is_error()).map(|i| i.message.as_str()).collect::<Vec<_>>().join("; ")
}

impl From<ForgeError> for String {
    fn from(val: ForgeError) -> Self {
        val.to_string()
    }
}

impl From<std::io::Error> for ForgeError {
    fn from(error: std::io::Error) -> Self {
        ForgeError::IoError(error.to_string())
    }
}

impl From<ForgeError> for std::io::Error {
    fn from(val: ForgeError) -> Self {
        std::io::Error::new(ErrorKind::Other, val.to_string())
    }
}

impl From<serde_json::Error> for ForgeError {
    fn from(error: serde_json::Error) -> Self {
        ForgeError::Convert(error.to_string())
    }
}

impl From<toml::de::Error> for ForgeError {
    fn from(error: toml::de::Error) -> Self {
        ForgeError::Config(error.to_string())
    }
}
