use serde::{Deserialize, Serialize};

use crate::{
    Result,
    flow::FlowDefinition,
    store::{DbCollectionIden, StoreIden},
};

/// A deployed flow; `data` holds the flow JSON.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct FlowRecord {
    pub id: String,
    pub name: String,
    pub desc: String,
    pub data: String,
    pub create_time: i64,
    pub update_time: i64,
}

impl FlowRecord {
    pub fn definition(&self) -> Result<FlowDefinition> {
        FlowDefinition::from_json(&self.data)
    }
}

impl DbCollectionIden for FlowRecord {
    fn iden() -> StoreIden {
        StoreIden::Flows
    }
}
