use std::{
    any::Any,
    collections::HashMap,
    sync::{Arc, RwLock},
};

use tracing::trace;

use crate::{ForgeError, Result, ShareLock, flow::FlowDefinition, utils};

use super::{DbCollection, DbCollectionIden, data::*, query::Query};

#[derive(Clone)]
pub struct DynDbSetRef<T>(Arc<dyn DbCollection<Item = T>>);

/// Typed registry of collections.
pub struct Store {
    collections: ShareLock<HashMap<super::StoreIden, Arc<dyn Any + Send + Sync + 'static>>>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        Self {
            collections: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn collection<DATA>(&self) -> Result<Arc<dyn DbCollection<Item = DATA>>>
    where
        DATA: DbCollectionIden + Send + Sync + 'static,
    {
        let collections = self.collections.read().map_err(|e| ForgeError::Store(e.to_string()))?;
        let iden = DATA::iden();

        collections
            .get(&iden)
            .and_then(|collection| collection.downcast_ref::<DynDbSetRef<DATA>>())
            .map(|v| v.0.clone())
            .ok_or_else(|| ForgeError::Store(format!("fail to get collection: {}", iden.as_ref())))
    }

    pub fn register<DATA>(
        &self,
        collection: Arc<dyn DbCollection<Item = DATA> + Send + Sync + 'static>,
    ) -> Result<()>
    where
        DATA: DbCollectionIden + 'static,
    {
        let mut collections = self.collections.write().map_err(|e| ForgeError::Store(e.to_string()))?;
        collections.insert(DATA::iden(), Arc::new(DynDbSetRef::<DATA>(collection)));
        Ok(())
    }

    pub fn flows(&self) -> Result<Arc<dyn DbCollection<Item = FlowRecord>>> {
        self.collection()
    }

    pub fn runs(&self) -> Result<Arc<dyn DbCollection<Item = FlowRun>>> {
        self.collection()
    }

    pub fn run_nodes(&self) -> Result<Arc<dyn DbCollection<Item = FlowRunNode>>> {
        self.collection()
    }

    /// Store `def` as JSON, creating or replacing the record.
    pub fn deploy(
        &self,
        def: &FlowDefinition,
    ) -> Result<bool> {
        trace!("store::deploy({})", def.id);
        if def.id.is_empty() {
            return Err(ForgeError::Flow("missing id in flow".into()));
        }
        let text = def.to_json()?;
        let flows = self.flows()?;

        if flows.exists(&def.id)? {
            let current = flows.find(&def.id)?;
            flows.update(&FlowRecord {
                id: def.id.clone(),
                name: def.name.clone(),
                desc: def.desc.clone(),
                data: text,
                create_time: current.create_time,
                update_time: utils::time::time_millis(),
            })
        } else {
            flows.create(&FlowRecord {
                id: def.id.clone(),
                name: def.name.clone(),
                desc: def.desc.clone(),
                data: text,
                create_time: utils::time::time_millis(),
                update_time: 0,
            })
        }
    }

    /// Every node record of a run, in flow definition order.
    pub fn run_nodes_of(
        &self,
        run_id: &str,
    ) -> Result<Vec<FlowRunNode>> {
        trace!("store::run_nodes_of({})", run_id);
        let query = Query::new().filter("run_id", run_id).order("seq", false).set_limit(usize::MAX);
        Ok(self.run_nodes()?.query(&query)?.rows)
    }
}
