//! In-memory [`CacheStore`] backed by [`DashMap`].
//!
//! Unbounded and never expires: once populated, a key is served for the
//! lifetime of the store. Concurrent readers and writers do not block each
//! other beyond `DashMap`'s per-shard locks.

use dashmap::DashMap;
use serde_json::Value;
use vaultkit_core::CacheKey;

use crate::cache::store::{CacheError, CacheStore};

/// Unbounded concurrent map store.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: DashMap<CacheKey, Value>,
}

impl MemoryCacheStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn contains_key(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Point-in-time copy of all keys, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<CacheKey> {
        let mut keys: Vec<CacheKey> = self.entries.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

impl CacheStore for MemoryCacheStore {
    fn get(&self, key: &CacheKey) -> Result<Option<Value>, CacheError> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    fn set(&self, key: CacheKey, value: Value) -> Result<(), CacheError> {
        self.entries.insert(key, value);
        Ok(())
    }
}
