use std::collections::HashMap;

use serde_json::{Value as JsonValue, json};

use crate::{
    Result,
    store::{data::FlowRun, db::mem::DbDocument},
};

impl DbDocument for FlowRun {
    fn id(&self) -> &str {
        &self.id
    }

    fn doc(&self) -> Result<HashMap<String, JsonValue>> {
        let mut map = HashMap::new();
        map.insert("id".to_string(), json!(self.id.clone()));
        map.insert("flow_id".to_string(), json!(self.flow_id.clone()));
        map.insert("status".to_string(), json!(self.status.as_ref()));
        map.insert("total_sparks_spent".to_string(), json!(self.total_sparks_spent));
        map.insert("started_at".to_string(), json!(self.started_at));
        map.insert("finished_at".to_string(), json!(self.finished_at));
        Ok(map)
    }
}
