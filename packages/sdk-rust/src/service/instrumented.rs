//! Instrumented components.
//!
//! [`instrument`] and [`instrument_reader`] take a component, collect its
//! declared operations once, and wrap each one in its middleware stack.
//! The resulting [`Instrumented`] value is the only way callers reach the
//! operations, so every call is normalized, published and (for readers)
//! cached.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::task::{Context, Poll};

use serde::de::DeserializeOwned;
use serde_json::Value;
use tower::{Service, ServiceExt};
use tracing::debug;
use uuid::Uuid;
use vaultkit_core::{Args, DomainError, FailureOrigin, OperationDescriptor};

use super::component::{Component, Reader};
use super::middleware::{build_base_stack, build_reader_stack, CacheLayer, InstrumentLayer};
use super::operation::{OperationTable, RegistrationError};
use super::outcome::{CallKind, Outcome};
use crate::cache::{CacheStats, CacheStatsSnapshot, CacheStore};
use crate::context::SdkContext;
use crate::events::{Event, EventChannel, SubscriptionHandle};

// ---------------------------------------------------------------------------
// Type-erased operation stack
// ---------------------------------------------------------------------------

/// A fully layered operation with its concrete stack type erased.
trait OperationStack: Send + Sync {
    fn invoke(&self, args: Args) -> Outcome;
}

impl<S> OperationStack for S
where
    S: Service<Args, Response = Value, Error = DomainError, Future = Outcome>
        + Clone
        + Send
        + Sync
        + 'static,
{
    fn invoke(&self, args: Args) -> Outcome {
        let mut svc = self.clone();
        let waker = futures_util::task::noop_waker_ref();
        let mut cx = Context::from_waker(waker);
        match svc.poll_ready(&mut cx) {
            Poll::Ready(Ok(())) => svc.call(args),
            Poll::Ready(Err(error)) => Outcome::err(error),
            // Not ready yet: wait for readiness inside a suspension.
            Poll::Pending => Outcome::pending(svc.oneshot(args)),
        }
    }
}

struct Slot {
    descriptor: OperationDescriptor,
    kind: CallKind,
    stack: Box<dyn OperationStack>,
}

// ---------------------------------------------------------------------------
// Instrumented
// ---------------------------------------------------------------------------

/// A component whose declared operations are reachable only through the
/// instrumentation stack.
pub struct Instrumented<C> {
    component: Arc<C>,
    slots: Vec<Slot>,
    index: HashMap<&'static str, usize>,
    events: Arc<EventChannel>,
    cache_stats: Option<Arc<CacheStats>>,
    session_id: Uuid,
}

/// Instruments `component` with error normalization and event publication.
///
/// # Errors
///
/// Returns a [`RegistrationError`] if the component's name or one of its
/// operation names is invalid, or an operation is declared twice.
pub fn instrument<C: Component>(
    component: C,
    ctx: &SdkContext,
) -> Result<Instrumented<C>, RegistrationError> {
    Instrumented::build(Arc::new(component), ctx, None)
}

/// Instruments a read-only `component`: as [`instrument`], plus result
/// caching in the context's cache store.
///
/// # Errors
///
/// See [`instrument`].
pub fn instrument_reader<C: Reader>(
    component: C,
    ctx: &SdkContext,
) -> Result<Instrumented<C>, RegistrationError> {
    Instrumented::build(Arc::new(component), ctx, Some(ctx.cache()))
}

impl<C: Component> Instrumented<C> {
    fn build(
        component: Arc<C>,
        ctx: &SdkContext,
        cache: Option<Arc<dyn CacheStore>>,
    ) -> Result<Self, RegistrationError> {
        vaultkit_core::validate_name("component", C::NAME)?;

        let mut table = OperationTable::new(C::NAME);
        Arc::clone(&component).register(&mut table);
        let entries = table.finish()?;

        let events = Arc::new(EventChannel::new());
        let cache_stats = cache.as_ref().map(|_| Arc::new(CacheStats::default()));
        let fail_on_handler_error = ctx.config().fail_on_handler_error;

        let mut slots = Vec::with_capacity(entries.len());
        let mut index = HashMap::with_capacity(entries.len());
        for entry in entries {
            let instrument =
                InstrumentLayer::new(entry.descriptor, Arc::clone(&events), fail_on_handler_error);
            let stack: Box<dyn OperationStack> = match (&cache, &cache_stats) {
                (Some(store), Some(stats)) => {
                    let cache = CacheLayer::new(
                        entry.descriptor,
                        entry.kind,
                        Arc::clone(store),
                        Arc::clone(stats),
                    );
                    Box::new(build_reader_stack(entry.raw, instrument, cache))
                }
                _ => Box::new(build_base_stack(entry.raw, instrument)),
            };
            index.insert(entry.descriptor.operation, slots.len());
            slots.push(Slot {
                descriptor: entry.descriptor,
                kind: entry.kind,
                stack,
            });
        }

        debug!(
            session = %ctx.session_id(),
            component = C::NAME,
            operations = slots.len(),
            cached = cache.is_some(),
            "component instrumented"
        );

        Ok(Self {
            component,
            slots,
            index,
            events,
            cache_stats,
            session_id: ctx.session_id(),
        })
    }

    /// Calls `operation` with `args`.
    ///
    /// The outcome has the operation's declared calling convention whether
    /// or not the result came from the cache. Calling an undeclared
    /// operation yields an immediate [`FailureOrigin::UnknownOperation`]
    /// error.
    pub fn call(&self, operation: &str, args: Args) -> Outcome {
        match self.slot(operation) {
            Some(slot) => slot.stack.invoke(args),
            None => Outcome::err(DomainError::unknown_operation(C::NAME, operation)),
        }
    }

    /// Calls `operation` and decodes the resolved value as `T`.
    ///
    /// # Errors
    ///
    /// Returns the operation's [`DomainError`], or one with
    /// [`FailureOrigin::Decode`] if the value does not decode as `T`.
    pub async fn call_as<T: DeserializeOwned>(
        &self,
        operation: &str,
        args: Args,
    ) -> Result<T, DomainError> {
        let Some(descriptor) = self.descriptor(operation) else {
            return Err(DomainError::unknown_operation(C::NAME, operation));
        };
        let value = self.call(operation, args).await?;
        serde_json::from_value(value)
            .map_err(|e| DomainError::new(&descriptor, FailureOrigin::Decode, e.to_string()))
    }

    /// The component's event channel.
    #[must_use]
    pub fn events(&self) -> &Arc<EventChannel> {
        &self.events
    }

    /// Subscribes to successful results of `operation`.
    pub fn subscribe<F>(&self, operation: impl Into<String>, handler: F) -> SubscriptionHandle
    where
        F: Fn(&Event<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.events.subscribe(operation, handler)
    }

    /// Subscribes to successful results of every operation.
    pub fn subscribe_all<F>(&self, handler: F) -> SubscriptionHandle
    where
        F: Fn(&Event<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.events.subscribe_all(handler)
    }

    pub fn unsubscribe(&self, handle: SubscriptionHandle) -> bool {
        self.events.unsubscribe(handle)
    }

    /// Declared operation names, in declaration order.
    #[must_use]
    pub fn operations(&self) -> Vec<&'static str> {
        self.slots.iter().map(|s| s.descriptor.operation).collect()
    }

    #[must_use]
    pub fn descriptor(&self, operation: &str) -> Option<OperationDescriptor> {
        self.slot(operation).map(|s| s.descriptor)
    }

    #[must_use]
    pub fn kind(&self, operation: &str) -> Option<CallKind> {
        self.slot(operation).map(|s| s.kind)
    }

    /// The uninstrumented component. Calling its methods directly bypasses
    /// normalization, events and caching.
    #[must_use]
    pub fn component(&self) -> &Arc<C> {
        &self.component
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        C::NAME
    }

    #[must_use]
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Cache counters, or `None` if the component is not cached.
    #[must_use]
    pub fn cache_stats(&self) -> Option<CacheStatsSnapshot> {
        self.cache_stats.as_ref().map(|s| s.snapshot())
    }

    fn slot(&self, operation: &str) -> Option<&Slot> {
        self.index.get(operation).map(|&i| &self.slots[i])
    }
}

impl<C> fmt::Debug for Instrumented<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let operations: Vec<_> = self.slots.iter().map(|s| s.descriptor.operation).collect();
        f.debug_struct("Instrumented")
            .field("operations", &operations)
            .field("events", &self.events)
            .field("cached", &self.cache_stats.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use anyhow::anyhow;
    use vaultkit_core::args;

    use super::*;

    struct Lens {
        calls: AtomicUsize,
    }

    impl Component for Lens {
        const NAME: &'static str = "Lens";

        fn register(self: Arc<Self>, ops: &mut OperationTable) {
            let this = Arc::clone(&self);
            ops.deferred("getAssets", move |_| {
                this.calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(vec!["0x1", "0x2"]) }
            })
            .immediate("fail", |_| -> anyhow::Result<()> { Err(anyhow!("boom")) });
        }
    }

    impl Reader for Lens {}

    fn lens() -> Lens {
        Lens {
            calls: AtomicUsize::new(0),
        }
    }

    #[tokio::test]
    async fn reader_caches_and_counts() {
        let ctx = SdkContext::default();
        let lens = instrument_reader(lens(), &ctx).unwrap();

        let first: Vec<String> = lens.call_as("getAssets", args![]).await.unwrap();
        let second: Vec<String> = lens.call_as("getAssets", args![]).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(lens.component().calls.load(Ordering::SeqCst), 1);

        let stats = lens.cache_stats().unwrap();
        assert_eq!((stats.hits, stats.misses), (1, 1));
    }

    #[tokio::test]
    async fn plain_instrumentation_does_not_cache() {
        let lens = instrument(lens(), &SdkContext::default()).unwrap();
        lens.call("getAssets", args![]).await.unwrap();
        lens.call("getAssets", args![]).await.unwrap();
        assert_eq!(lens.component().calls.load(Ordering::SeqCst), 2);
        assert!(lens.cache_stats().is_none());
    }

    #[test]
    fn unknown_operation_is_a_domain_error() {
        let lens = instrument(lens(), &SdkContext::default()).unwrap();
        let error = lens.call("burn", args![]).try_now().unwrap().unwrap_err();
        assert_eq!(error.origin, FailureOrigin::UnknownOperation);
        assert_eq!(error.component, "Lens");
        assert_eq!(error.operation, "burn");
    }

    #[tokio::test]
    async fn decode_failure_is_attributed() {
        let lens = instrument(lens(), &SdkContext::default()).unwrap();
        let error = lens.call_as::<u64>("getAssets", args![]).await.unwrap_err();
        assert_eq!(error.origin, FailureOrigin::Decode);
        assert_eq!(error.operation, "getAssets");
    }

    #[tokio::test]
    async fn typed_call_to_unknown_operation_is_a_domain_error() {
        let lens = instrument(lens(), &SdkContext::default()).unwrap();
        let error = lens.call_as::<Vec<String>>("burn", args![]).await.unwrap_err();
        assert_eq!(error.origin, FailureOrigin::UnknownOperation);
        assert_eq!(error.operation, "burn");
        assert_eq!(lens.component().calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn operations_are_listed_in_declaration_order() {
        let lens = instrument(lens(), &SdkContext::default()).unwrap();
        assert_eq!(lens.operations(), vec!["getAssets", "fail"]);
        assert_eq!(lens.kind("getAssets"), Some(CallKind::Deferred));
        assert_eq!(lens.kind("fail"), Some(CallKind::Immediate));
        assert!(lens.descriptor("missing").is_none());
    }

    #[test]
    fn invalid_component_name_is_rejected() {
        struct Bad;
        impl Component for Bad {
            const NAME: &'static str = "Bad.Name";
            fn register(self: Arc<Self>, _ops: &mut OperationTable) {}
        }
        assert!(matches!(
            instrument(Bad, &SdkContext::default()),
            Err(RegistrationError::InvalidName(_))
        ));
    }
}
