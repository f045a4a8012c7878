use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use serde_json::Value;

use crate::{
    common::{MemCache, Shutdown},
    events::Message,
    flow::NodeId,
    runtime::{Channel, RunId},
};

/// State shared by the orchestrator loop and the node tasks of one run.
#[derive(Clone)]
pub struct RunContext {
    run_id: RunId,
    env: Arc<HashMap<String, String>>,
    outputs: Arc<MemCache<NodeId, Value>>,
    channel: Arc<Channel>,

    /// flipped once the run is aborted
    cancel: Arc<Shutdown>,
}

impl RunContext {
    pub fn new(
        run_id: RunId,
        env: HashMap<String, String>,
        node_count: usize,
        channel: Arc<Channel>,
    ) -> Self {
        Self {
            run_id,
            env: Arc::new(env),
            outputs: Arc::new(MemCache::new(node_count)),
            channel,
            cancel: Arc::new(Shutdown::new()),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn env(&self) -> &HashMap<String, String> {
        &self.env
    }

    pub fn add_output(
        &self,
        node_id: NodeId,
        output: Value,
    ) {
        self.outputs.set(node_id, output);
    }

    /// Outputs of `node_ids` that have one, keyed by node id.
    pub fn outputs_of<'a>(
        &self,
        node_ids: impl IntoIterator<Item = &'a NodeId>,
    ) -> BTreeMap<NodeId, Value> {
        node_ids.into_iter().filter_map(|id| self.outputs.get(id).map(|v| (id.clone(), v))).collect()
    }

    pub fn emit(
        &self,
        msg: Message,
    ) {
        self.channel.emit(msg);
    }

    pub fn cancel(&self) {
        self.cancel.shutdown();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_terminated()
    }

    pub async fn cancelled(&self) {
        self.cancel.wait().await
    }
}
