use std::any::{Any, TypeId};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use vaultkit_core::{Args, DomainError};

use super::component::Component;
use super::instrumented::Instrumented;
use super::outcome::Outcome;
use crate::cache::CacheStatsSnapshot;
use crate::events::EventChannel;

// ---------------------------------------------------------------------------
// ManagedComponent trait
// ---------------------------------------------------------------------------

/// Name-addressable view of an instrumented component.
///
/// Implemented by every [`Instrumented<C>`]. The `Any` bound enables
/// type-based lookup via `ServiceRegistry::get::<C>()`.
pub trait ManagedComponent: Send + Sync + Any {
    /// Returns the component name (e.g. `"Lens"`).
    fn name(&self) -> &'static str;

    /// Calls `operation` by name. See [`Instrumented::call`].
    fn call(&self, operation: &str, args: Args) -> Outcome;

    /// Declared operation names, in declaration order.
    fn operations(&self) -> Vec<&'static str>;

    fn events(&self) -> &Arc<EventChannel>;

    fn cache_stats(&self) -> Option<CacheStatsSnapshot>;
}

impl<C: Component> ManagedComponent for Instrumented<C> {
    fn name(&self) -> &'static str {
        C::NAME
    }

    fn call(&self, operation: &str, args: Args) -> Outcome {
        Instrumented::call(self, operation, args)
    }

    fn operations(&self) -> Vec<&'static str> {
        Instrumented::operations(self)
    }

    fn events(&self) -> &Arc<EventChannel> {
        Instrumented::events(self)
    }

    fn cache_stats(&self) -> Option<CacheStatsSnapshot> {
        Instrumented::cache_stats(self)
    }
}

// ---------------------------------------------------------------------------
// ServiceRegistry
// ---------------------------------------------------------------------------

struct Registered {
    type_id: TypeId,
    component: Arc<dyn ManagedComponent>,
}

/// The instrumented components of one client session.
///
/// Provides two lookup mechanisms:
/// - **By name** (`get_by_name`): uses the component's `NAME`
/// - **By type** (`get::<C>`): uses `TypeId` for compile-time dispatch
///
/// A session holds at most one instance per component name; registering
/// another replaces it and keeps its original position in `names()`.
pub struct ServiceRegistry {
    /// Name-based lookup: component name -> registered instance.
    by_name: DashMap<&'static str, Registered>,
    /// Type-based lookup: `TypeId` of the component -> `Arc<Instrumented<C>>`.
    by_type: DashMap<TypeId, Arc<dyn Any + Send + Sync>>,
    /// Registration order.
    order: RwLock<Vec<&'static str>>,
}

impl ServiceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            by_name: DashMap::new(),
            by_type: DashMap::new(),
            order: RwLock::new(Vec::new()),
        }
    }

    /// Registers an instrumented component and returns the shared handle.
    pub fn register<C: Component>(&self, component: Instrumented<C>) -> Arc<Instrumented<C>> {
        let name = C::NAME;
        let type_id = TypeId::of::<C>();
        let arc = Arc::new(component);

        let previous = self.by_name.insert(
            name,
            Registered {
                type_id,
                component: arc.clone(),
            },
        );
        match previous {
            Some(previous) if previous.type_id != type_id => {
                self.by_type.remove(&previous.type_id);
            }
            Some(_) => {}
            None => self.order.write().push(name),
        }
        self.by_type.insert(type_id, arc.clone());
        arc
    }

    /// Retrieve a component by its concrete type.
    pub fn get<C: Component>(&self) -> Option<Arc<Instrumented<C>>> {
        self.by_type
            .get(&TypeId::of::<C>())
            .and_then(|entry| entry.value().clone().downcast::<Instrumented<C>>().ok())
    }

    /// Retrieve a component by its name.
    pub fn get_by_name(&self, name: &str) -> Option<Arc<dyn ManagedComponent>> {
        self.by_name
            .get(name)
            .map(|entry| Arc::clone(&entry.value().component))
    }

    /// Calls `component.operation`. An unregistered component yields an
    /// immediate [`DomainError`].
    pub fn call(&self, component: &str, operation: &str, args: Args) -> Outcome {
        match self.get_by_name(component) {
            Some(found) => found.call(operation, args),
            None => Outcome::err(DomainError::unknown_component(component, operation)),
        }
    }

    /// Registered component names, in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.order.read().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use serde_json::json;
    use vaultkit_core::{args, FailureOrigin};

    use super::*;
    use crate::context::SdkContext;
    use crate::service::instrumented::{instrument, instrument_reader};
    use crate::service::{OperationTable, Reader};

    struct Lens;

    impl Component for Lens {
        const NAME: &'static str = "Lens";

        fn register(self: Arc<Self>, ops: &mut OperationTable) {
            ops.immediate("get", |_| Ok("lens"));
        }
    }

    impl Reader for Lens {}

    struct Tokens {
        symbol: &'static str,
    }

    impl Component for Tokens {
        const NAME: &'static str = "Tokens";

        fn register(self: Arc<Self>, ops: &mut OperationTable) {
            let this = Arc::clone(&self);
            ops.immediate("get", move |_| Ok(this.symbol));
        }
    }

    /// A distinct type reusing another component's name.
    struct ImpostorLens;

    impl Component for ImpostorLens {
        const NAME: &'static str = "Lens";

        fn register(self: Arc<Self>, ops: &mut OperationTable) {
            ops.immediate("get", |_| Ok("impostor"));
        }
    }

    #[test]
    fn lookup_by_type_and_name() {
        let ctx = SdkContext::default();
        let registry = ServiceRegistry::new();
        registry.register(instrument_reader(Lens, &ctx).unwrap());
        registry.register(instrument(Tokens { symbol: "USDC" }, &ctx).unwrap());

        let lens = registry.get::<Lens>().unwrap();
        assert_eq!(lens.name(), "Lens");
        assert!(registry.get_by_name("Tokens").is_some());
        assert!(registry.get_by_name("Missing").is_none());
        assert_eq!(registry.names(), vec!["Lens", "Tokens"]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn call_by_name_routes_to_component() {
        let ctx = SdkContext::default();
        let registry = ServiceRegistry::new();
        registry.register(instrument(Tokens { symbol: "USDC" }, &ctx).unwrap());

        let value = registry.call("Tokens", "get", args![]).try_now().unwrap().unwrap();
        assert_eq!(value, json!("USDC"));
    }

    #[test]
    fn unknown_component_is_a_domain_error() {
        let registry = ServiceRegistry::new();
        let error = registry
            .call("Vault", "get", args![])
            .try_now()
            .unwrap()
            .unwrap_err();
        assert_eq!(error.origin, FailureOrigin::UnknownOperation);
        assert_eq!(error.component, "Vault");
    }

    #[test]
    fn re_registering_replaces_without_reordering() {
        let ctx = SdkContext::default();
        let registry = ServiceRegistry::new();
        registry.register(instrument(Tokens { symbol: "USDC" }, &ctx).unwrap());
        registry.register(instrument(Lens, &ctx).unwrap());
        registry.register(instrument(Tokens { symbol: "DAI" }, &ctx).unwrap());

        assert_eq!(registry.names(), vec!["Tokens", "Lens"]);
        let value = registry.call("Tokens", "get", args![]).try_now().unwrap().unwrap();
        assert_eq!(value, json!("DAI"));
    }

    #[test]
    fn same_name_different_type_drops_stale_type_entry() {
        let ctx = SdkContext::default();
        let registry = ServiceRegistry::new();
        registry.register(instrument(Lens, &ctx).unwrap());
        registry.register(instrument(ImpostorLens, &ctx).unwrap());

        assert!(registry.get::<Lens>().is_none());
        assert!(registry.get::<ImpostorLens>().is_some());
        assert_eq!(registry.len(), 1);
    }
}
