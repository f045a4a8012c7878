//! Wire models: the JSON shape a flow is authored and stored in.
//!
//! These types mirror the visual editor's document one-to-one. They are
//! converted into the typed [`crate::FlowDefinition`] before anything else
//! looks at them.

mod edge;
mod flow;
mod node;

pub use edge::EdgeModel;
pub use flow::FlowModel;
pub use node::{NodeModel, Position, RetryConfig};
