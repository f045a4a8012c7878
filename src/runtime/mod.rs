mod channel;
mod context;
mod run;

pub use channel::{Channel, ChannelEvent, ChannelOptions};
pub use context::RunContext;
pub use run::{Run, RunCommand, RunId};
