use std::{
    cmp::Ordering,
    collections::BTreeMap,
    fmt,
    sync::RwLock,
};

use serde_json::Value as JsonValue;
use tracing::trace;

use crate::{
    ForgeError, Result,
    store::{DbCollection, PageData, query::Query},
};

use super::DbDocument;

/// One in-memory collection, keyed by record id.
pub struct Collect<T> {
    name: String,
    items: RwLock<BTreeMap<String, T>>,
}

impl<T> fmt::Debug for Collect<T> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Collect").field("name", &self.name).finish()
    }
}

impl<T> Collect<T> {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            items: RwLock::new(BTreeMap::new()),
        }
    }

    fn poisoned(&self) -> ForgeError {
        ForgeError::Store(format!("collection '{}' lock is poisoned", self.name))
    }

    fn not_found(
        &self,
        id: &str,
    ) -> ForgeError {
        ForgeError::Store(format!("record '{}' not found in '{}'", id, self.name))
    }
}

/// Orders JSON scalars; mixed or structured values compare equal.
fn compare_json(
    a: Option<&JsonValue>,
    b: Option<&JsonValue>,
) -> Ordering {
    match (a, b) {
        (Some(JsonValue::Number(x)), Some(JsonValue::Number(y))) => x.as_f64().partial_cmp(&y.as_f64()).unwrap_or(Ordering::Equal),
        (Some(JsonValue::String(x)), Some(JsonValue::String(y))) => x.cmp(y),
        (Some(JsonValue::Bool(x)), Some(JsonValue::Bool(y))) => x.cmp(y),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

impl<T> DbCollection for Collect<T>
where
    T: DbDocument + Clone + Send + Sync,
{
    type Item = T;

    fn exists(
        &self,
        id: &str,
    ) -> Result<bool> {
        trace!("{}::exists({})", self.name, id);
        let items = self.items.read().map_err(|_| self.poisoned())?;
        Ok(items.contains_key(id))
    }

    fn find(
        &self,
        id: &str,
    ) -> Result<Self::Item> {
        trace!("{}::find({})", self.name, id);
        let items = self.items.read().map_err(|_| self.poisoned())?;
        items.get(id).cloned().ok_or_else(|| self.not_found(id))
    }

    fn query(
        &self,
        q: &Query,
    ) -> Result<PageData<Self::Item>> {
        trace!("{}::query({:?})", self.name, q);
        let items = self.items.read().map_err(|_| self.poisoned())?;

        let mut matched = Vec::new();
        for item in items.values() {
            let doc = item.doc()?;
            if q.filters().iter().all(|(field, value)| doc.get(field) == Some(value)) {
                matched.push((doc, item));
            }
        }

        // stable sort keeps id order between equal keys
        matched.sort_by(|(a, _), (b, _)| {
            q.order_by()
                .iter()
                .map(|(field, rev)| {
                    let ord = compare_json(a.get(field), b.get(field));
                    if *rev { ord.reverse() } else { ord }
                })
                .find(|ord| *ord != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });

        let count = matched.len();
        let rows = matched.into_iter().skip(q.offset()).take(q.limit()).map(|(_, item)| item.clone()).collect();

        Ok(PageData {
            count,
            page_num: q.offset() / q.limit() + 1,
            page_count: count.div_ceil(q.limit()),
            page_size: q.limit(),
            rows,
        })
    }

    fn create(
        &self,
        data: &Self::Item,
    ) -> Result<bool> {
        trace!("{}::create({})", self.name, data.id());
        let mut items = self.items.write().map_err(|_| self.poisoned())?;
        if items.contains_key(data.id()) {
            return Err(ForgeError::Store(format!("record '{}' already exists in '{}'", data.id(), self.name)));
        }
        items.insert(data.id().to_string(), data.clone());
        Ok(true)
    }

    fn create_many(
        &self,
        data: &[Self::Item],
    ) -> Result<usize> {
        trace!("{}::create_many({})", self.name, data.len());
        let mut items = self.items.write().map_err(|_| self.poisoned())?;

        let mut ids = std::collections::HashSet::new();
        for item in data {
            if items.contains_key(item.id()) || !ids.insert(item.id()) {
                return Err(ForgeError::Store(format!("record '{}' already exists in '{}'", item.id(), self.name)));
            }
        }
        for item in data {
            items.insert(item.id().to_string(), item.clone());
        }
        Ok(data.len())
    }

    fn update(
        &self,
        data: &Self::Item,
    ) -> Result<bool> {
        trace!("{}::update({})", self.name, data.id());
        let mut items = self.items.write().map_err(|_| self.poisoned())?;
        match items.get_mut(data.id()) {
            Some(item) => {
                *item = data.clone();
                Ok(true)
            }
            None => Err(self.not_found(data.id())),
        }
    }

    fn delete(
        &self,
        id: &str,
    ) -> Result<bool> {
        trace!("{}::delete({})", self.name, id);
        let mut items = self.items.write().map_err(|_| self.poisoned())?;
        Ok(items.remove(id).is_some())
    }
}
