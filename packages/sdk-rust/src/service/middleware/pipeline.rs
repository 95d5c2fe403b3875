//! Pipeline composition: wraps a raw operation body in the middleware stack.

use tower::ServiceBuilder;

use super::cache::{CacheLayer, CacheService};
use super::instrument::{InstrumentLayer, InstrumentService};
use crate::service::operation::RawOperation;

/// Stack of an operation on an ordinary component.
pub type BaseStack = InstrumentService<RawOperation>;

/// Stack of an operation on a read-only component.
pub type ReaderStack = CacheService<BaseStack>;

/// Wraps `raw` with error normalization and event publication.
#[must_use]
pub fn build_base_stack(raw: RawOperation, instrument: InstrumentLayer) -> BaseStack {
    ServiceBuilder::new().layer(instrument).service(raw)
}

/// Wraps `raw` for a read-only component.
///
/// Layer order (outermost to innermost):
/// 1. `CacheLayer` -- serve stored results without running the operation
/// 2. `InstrumentLayer` -- publish results and normalize failures
///
/// A cache hit therefore publishes no event, and only values that passed
/// through the instrumentation (published without failing handlers) are
/// stored.
#[must_use]
pub fn build_reader_stack(
    raw: RawOperation,
    instrument: InstrumentLayer,
    cache: CacheLayer,
) -> ReaderStack {
    ServiceBuilder::new()
        .layer(cache)
        .layer(instrument)
        .service(raw)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use anyhow::anyhow;
    use serde_json::json;
    use tower::{Service, ServiceExt};
    use vaultkit_core::{args, FailureOrigin, OperationDescriptor};

    use super::*;
    use crate::cache::{CacheStats, MemoryCacheStore};
    use crate::events::{Event, EventChannel};
    use crate::service::outcome::{CallKind, Outcome};

    fn descriptor() -> OperationDescriptor {
        OperationDescriptor::new("Lens", "getAssets").unwrap()
    }

    #[tokio::test]
    async fn reader_stack_publishes_only_on_miss() {
        let events = Arc::new(EventChannel::new());
        let published = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&published);
        events.subscribe_all(move |_: &Event<'_>| {
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let store = Arc::new(MemoryCacheStore::new());
        let stats = Arc::new(CacheStats::default());
        let mut svc = build_reader_stack(
            RawOperation::new(|_| Outcome::pending(async { Ok(json!(["0x1"])) })),
            InstrumentLayer::new(descriptor(), Arc::clone(&events), true),
            CacheLayer::new(descriptor(), CallKind::Deferred, store.clone(), stats),
        );

        svc.call(args![]).await.unwrap();
        svc.call(args![]).await.unwrap();
        assert_eq!(published.load(Ordering::SeqCst), 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn handler_failure_keeps_result_out_of_cache() {
        let events = Arc::new(EventChannel::new());
        events.subscribe("getAssets", |_: &Event<'_>| Err(anyhow!("listener broke")));

        let store = Arc::new(MemoryCacheStore::new());
        let svc = build_reader_stack(
            RawOperation::new(|_| Outcome::ok(json!(1))),
            InstrumentLayer::new(descriptor(), events, true),
            CacheLayer::new(
                descriptor(),
                CallKind::Immediate,
                store.clone(),
                Arc::new(CacheStats::default()),
            ),
        );

        let error = svc.oneshot(args![]).await.unwrap_err();
        assert_eq!(error.origin, FailureOrigin::EventHandler);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn base_stack_normalizes_errors() {
        let svc = build_base_stack(
            RawOperation::new(|_| Outcome::err(anyhow!("boom"))),
            InstrumentLayer::new(descriptor(), Arc::new(EventChannel::new()), true),
        );
        let error = svc.oneshot(args![]).await.unwrap_err();
        assert_eq!(error.to_string(), "Lens.getAssets: boom");
    }
}
