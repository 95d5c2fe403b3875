//! Result caching for operations of read-only components.
//!
//! [`CacheLayer`] wraps an instrumented operation. Each call is keyed by
//! `Component.operation.<args>`; a stored value is returned without running
//! the operation (and without publishing an event), using the operation's
//! declared calling convention. On a miss the inner call runs (lifted into a
//! suspension if the operation is deferred but answered immediately) and its
//! successful result is stored before it reaches the caller. Failures are
//! never stored.

use std::sync::Arc;
use std::task::{Context, Poll};

use serde_json::Value;
use tower::{Layer, Service};
use tracing::{debug, warn};
use vaultkit_core::{encode, Args, CacheKey, DomainError, FailureOrigin, OperationDescriptor};

use crate::cache::{CacheError, CacheStats, CacheStore};
use crate::service::outcome::{CallKind, Outcome};

// ---------------------------------------------------------------------------
// CacheLayer
// ---------------------------------------------------------------------------

/// Tower layer that memoizes successful results in a [`CacheStore`].
#[derive(Clone)]
pub struct CacheLayer {
    descriptor: OperationDescriptor,
    kind: CallKind,
    store: Arc<dyn CacheStore>,
    stats: Arc<CacheStats>,
}

impl CacheLayer {
    #[must_use]
    pub fn new(
        descriptor: OperationDescriptor,
        kind: CallKind,
        store: Arc<dyn CacheStore>,
        stats: Arc<CacheStats>,
    ) -> Self {
        Self {
            descriptor,
            kind,
            store,
            stats,
        }
    }
}

impl<S> Layer<S> for CacheLayer {
    type Service = CacheService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CacheService {
            inner,
            descriptor: self.descriptor,
            kind: self.kind,
            store: Arc::clone(&self.store),
            stats: Arc::clone(&self.stats),
        }
    }
}

// ---------------------------------------------------------------------------
// CacheService
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct CacheService<S> {
    inner: S,
    descriptor: OperationDescriptor,
    kind: CallKind,
    store: Arc<dyn CacheStore>,
    stats: Arc<CacheStats>,
}

impl<S> Service<Args> for CacheService<S>
where
    S: Service<Args, Response = Value, Error = DomainError, Future = Outcome<DomainError>>,
{
    type Response = Value;
    type Error = DomainError;
    type Future = Outcome<DomainError>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, args: Args) -> Self::Future {
        let key = encode(&self.descriptor, &args);

        match self.store.get(&key) {
            Ok(Some(value)) => {
                self.stats.record_hit(&self.descriptor);
                debug!(key = %key, "cache hit");
                Outcome::deliver(self.kind, Ok(value))
            }
            Ok(None) => {
                self.stats.record_miss(&self.descriptor);
                debug!(key = %key, "cache miss");
                let descriptor = self.descriptor;
                let store = Arc::clone(&self.store);
                let stats = Arc::clone(&self.stats);
                self.inner
                    .call(args)
                    .map(move |result| populate(&descriptor, store.as_ref(), &stats, key, result))
                    .conform(self.kind)
            }
            Err(error) => {
                self.stats.record_error();
                Outcome::deliver(self.kind, Err(store_error(&self.descriptor, &key, &error)))
            }
        }
    }
}

fn populate(
    descriptor: &OperationDescriptor,
    store: &dyn CacheStore,
    stats: &CacheStats,
    key: CacheKey,
    result: Result<Value, DomainError>,
) -> Result<Value, DomainError> {
    let value = result?;
    let failed_key = key.clone();
    match store.set(key, value.clone()) {
        Ok(()) => {
            stats.record_store();
            Ok(value)
        }
        Err(error) => {
            stats.record_error();
            Err(store_error(descriptor, &failed_key, &error))
        }
    }
}

fn store_error(descriptor: &OperationDescriptor, key: &CacheKey, error: &CacheError) -> DomainError {
    warn!(key = %key, error = %error, "cache store failed");
    DomainError::new(descriptor, FailureOrigin::CacheStore, error.to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
