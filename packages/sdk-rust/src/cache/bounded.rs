//! Capacity-bounded [`CacheStore`] with optional time-to-live.
//!
//! Backed by `quick_cache`, which evicts by its own hit-frequency policy once
//! `capacity` is reached. When a TTL is configured, each entry records its
//! expiry instant; an expired entry reads as absent and is dropped on that
//! read unless it has been rewritten in the meantime.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use quick_cache::sync::Cache;
use serde_json::Value;
use vaultkit_core::CacheKey;

use crate::cache::store::{CacheError, CacheStore};

/// Time source for expiry checks. Replaceable in tests.
pub type Clock = Arc<dyn Fn() -> Instant + Send + Sync>;

#[derive(Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

/// Bounded in-memory store with optional TTL.
pub struct BoundedCacheStore {
    entries: Cache<CacheKey, Entry>,
    ttl: Option<Duration>,
    clock: Clock,
}

impl BoundedCacheStore {
    /// Creates a store holding at most `capacity` entries (minimum 1).
    #[must_use]
    pub fn new(capacity: usize, ttl: Option<Duration>) -> Self {
        Self::with_clock(capacity, ttl, Arc::new(Instant::now))
    }

    /// Like [`BoundedCacheStore::new`] with an explicit time source.
    #[must_use]
    pub fn with_clock(capacity: usize, ttl: Option<Duration>, clock: Clock) -> Self {
        Self {
            entries: Cache::new(capacity.max(1)),
            ttl,
            clock,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.len() == 0
    }

    #[must_use]
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// Removes the entry under `key` only if it is still the one that
    /// expired at `deadline`. A concurrent `set` may have replaced it.
    fn drop_expired(&self, key: &CacheKey, deadline: Instant) {
        self.entries
            .remove_if(key, |current| current.expires_at == Some(deadline));
    }
}

impl CacheStore for BoundedCacheStore {
    fn get(&self, key: &CacheKey) -> Result<Option<Value>, CacheError> {
        let Some(entry) = self.entries.get(key) else {
            return Ok(None);
        };
        match entry.expires_at {
            Some(deadline) if (self.clock)() >= deadline => {
                self.drop_expired(key, deadline);
                Ok(None)
            }
            _ => Ok(Some(entry.value)),
        }
    }

    fn set(&self, key: CacheKey, value: Value) -> Result<(), CacheError> {
        let expires_at = self.ttl.map(|ttl| (self.clock)() + ttl);
        self.entries.insert(key, Entry { value, expires_at });
        Ok(())
    }
}

impl fmt::Debug for BoundedCacheStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedCacheStore")
            .field("len", &self.entries.len())
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;
    use serde_json::json;
    use vaultkit_core::{args, encode, OperationDescriptor};

    use super::*;

    fn key(n: u64) -> CacheKey {
        encode(&OperationDescriptor::new("VaultReader", "apy").unwrap(), &args![n])
    }

    /// Clock that only moves when told to.
    fn manual_clock() -> (Clock, Arc<Mutex<Instant>>) {
        let now = Arc::new(Mutex::new(Instant::now()));
        let source = Arc::clone(&now);
        (Arc::new(move || *source.lock()), now)
    }

    #[test]
    fn stores_and_reads_without_ttl() {
        let store = BoundedCacheStore::new(16, None);
        store.set(key(1), json!("1.5%")).unwrap();
        assert_eq!(store.get(&key(1)).unwrap(), Some(json!("1.5%")));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn entry_expires_after_ttl() {
        let (clock, now) = manual_clock();
        let store = BoundedCacheStore::with_clock(16, Some(Duration::from_secs(30)), clock);
        store.set(key(1), json!(1)).unwrap();

        *now.lock() += Duration::from_secs(29);
        assert_eq!(store.get(&key(1)).unwrap(), Some(json!(1)));

        *now.lock() += Duration::from_secs(1);
        assert_eq!(store.get(&key(1)).unwrap(), None);
        assert!(store.is_empty());
    }

    #[test]
    fn expired_cleanup_keeps_a_fresh_rewrite() {
        let (clock, now) = manual_clock();
        let store = BoundedCacheStore::with_clock(16, Some(Duration::from_secs(10)), clock);
        let stale_deadline = *now.lock() + Duration::from_secs(10);
        store.set(key(1), json!(1)).unwrap();
        *now.lock() += Duration::from_secs(10);

        // A writer replaces the entry after a reader saw it expired.
        store.set(key(1), json!(2)).unwrap();
        store.drop_expired(&key(1), stale_deadline);
        assert_eq!(store.get(&key(1)).unwrap(), Some(json!(2)));

        store.drop_expired(&key(1), stale_deadline + Duration::from_secs(10));
        assert_eq!(store.get(&key(1)).unwrap(), None);
    }

    #[test]
    fn rewrite_refreshes_expiry() {
        let (clock, now) = manual_clock();
        let store = BoundedCacheStore::with_clock(16, Some(Duration::from_secs(10)), clock);
        store.set(key(1), json!(1)).unwrap();
        *now.lock() += Duration::from_secs(8);
        store.set(key(1), json!(2)).unwrap();
        *now.lock() += Duration::from_secs(8);
        assert_eq!(store.get(&key(1)).unwrap(), Some(json!(2)));
    }

    #[test]
    fn capacity_bounds_entry_count() {
        let store = BoundedCacheStore::new(8, None);
        for n in 0..200 {
            store.set(key(n), json!(n)).unwrap();
        }
        assert!(store.len() <= 8 * 2, "len {} exceeds bound", store.len());
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let store = BoundedCacheStore::new(0, None);
        store.set(key(1), json!(1)).unwrap();
        store.set(key(2), json!(2)).unwrap();
        assert!(store.len() <= 2);
    }
}
