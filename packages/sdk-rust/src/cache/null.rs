//! No-op [`CacheStore`] implementation.
//!
//! [`NullCacheStore`] discards all writes and misses every lookup. It is the
//! store selected by [`CacheBackend::Disabled`](crate::config::CacheBackend).

use serde_json::Value;
use vaultkit_core::CacheKey;

use crate::cache::store::{CacheError, CacheStore};

/// Cache store that never stores anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullCacheStore;

impl CacheStore for NullCacheStore {
    fn get(&self, _key: &CacheKey) -> Result<Option<Value>, CacheError> {
        Ok(None)
    }

    fn set(&self, _key: CacheKey, _value: Value) -> Result<(), CacheError> {
        Ok(())
    }
}
