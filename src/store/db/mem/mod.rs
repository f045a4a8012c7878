mod collect;
mod r#impl;

use std::{collections::HashMap, sync::Arc};

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value as JsonValue;

use crate::{
    Result,
    store::{DbCollection, DbStore, Store, data::*},
};
pub use collect::Collect;

/// In-process backend; contents live as long as the store.
#[derive(Debug, Clone)]
pub struct MemStore {
    flows: Arc<Collect<FlowRecord>>,
    runs: Arc<Collect<FlowRun>>,
    run_nodes: Arc<Collect<FlowRunNode>>,
}

/// A record the mem backend can filter and sort on.
trait DbDocument: Serialize + DeserializeOwned {
    fn id(&self) -> &str;
    fn doc(&self) -> Result<HashMap<String, JsonValue>>;
}

impl Default for MemStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DbStore for MemStore {
    fn init(
        &self,
        s: &Store,
    ) -> Result<()> {
        s.register(self.flows())?;
        s.register(self.runs())?;
        s.register(self.run_nodes())?;
        Ok(())
    }
}

impl MemStore {
    pub fn new() -> Self {
        Self {
            flows: Arc::new(Collect::new("flows")),
            runs: Arc::new(Collect::new("runs")),
            run_nodes: Arc::new(Collect::new("run_nodes")),
        }
    }

    pub fn flows(&self) -> Arc<dyn DbCollection<Item = FlowRecord> + Send + Sync> {
        self.flows.clone()
    }

    pub fn runs(&self) -> Arc<dyn DbCollection<Item = FlowRun> + Send + Sync> {
        self.runs.clone()
    }

    pub fn run_nodes(&self) -> Arc<dyn DbCollection<Item = FlowRunNode> + Send + Sync> {
        self.run_nodes.clone()
    }
}
