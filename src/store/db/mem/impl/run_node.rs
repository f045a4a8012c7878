use std::collections::HashMap;

use serde_json::{Value as JsonValue, json};

use crate::{
    Result,
    store::{data::FlowRunNode, db::mem::DbDocument},
};

impl DbDocument for FlowRunNode {
    fn id(&self) -> &str {
        &self.id
    }

    fn doc(&self) -> Result<HashMap<String, JsonValue>> {
        let mut map = HashMap::new();
        map.insert("id".to_string(), json!(self.id.clone()));
        map.insert("run_id".to_string(), json!(self.run_id.clone()));
        map.insert("node_id".to_string(), json!(self.node_id.clone()));
        map.insert("node_type".to_string(), json!(self.node_type.as_ref()));
        map.insert("seq".to_string(), json!(self.seq));
        map.insert("status".to_string(), json!(self.status.as_ref()));
        map.insert("sparks_spent".to_string(), json!(self.sparks_spent));
        Ok(map)
    }
}
