//! Concurrent in-memory cache backed by moka.

use std::{collections::HashMap, hash::Hash};

use moka::sync::Cache;

/// Smallest capacity handed to moka; tiny flows still get room for retries.
const MIN_CAPACITY: usize = 16;

/// Thread-safe key-value cache.
///
/// Used for node outputs produced during a run and for the engine's table of
/// live runs. Entries past `capacity` are evicted, so size it to the data set.
#[derive(Clone)]
pub struct MemCache<K, V> {
    entries: Cache<K, V>,
}

impl<K, V> MemCache<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Cache::new(capacity.max(MIN_CAPACITY) as u64),
        }
    }

    pub fn set(
        &self,
        key: K,
        value: V,
    ) {
        self.entries.insert(key, value);
    }

    pub fn get(
        &self,
        key: &K,
    ) -> Option<V> {
        self.entries.get(key)
    }

    pub fn contains(
        &self,
        key: &K,
    ) -> bool {
        self.entries.contains_key(key)
    }

    pub fn remove(
        &self,
        key: &K,
    ) {
        self.entries.invalidate(key);
    }

    /// Copy every live entry into a plain map.
    pub fn snapshot(&self) -> HashMap<K, V> {
        self.entries.iter().map(|(k, v)| ((*k).clone(), v)).collect()
    }
}
