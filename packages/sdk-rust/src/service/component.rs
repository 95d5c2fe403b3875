//! The contract a service type implements to be instrumented.

use std::sync::Arc;

use super::operation::OperationTable;

/// A service grouping related operations.
///
/// `register` declares every public operation exactly once; the
/// instrumentation wraps what is declared there and nothing else. Bodies
/// receive the component as an `Arc` so they can capture it:
///
/// ```
/// use std::sync::Arc;
/// use vaultkit_sdk::{Component, OperationTable};
///
/// struct Lens {
///     assets: Vec<String>,
/// }
///
/// impl Component for Lens {
///     const NAME: &'static str = "Lens";
///
///     fn register(self: Arc<Self>, ops: &mut OperationTable) {
///         let this = Arc::clone(&self);
///         ops.deferred("getAssets", move |_| {
///             let assets = this.assets.clone();
///             async move { Ok(assets) }
///         });
///     }
/// }
/// ```
pub trait Component: Send + Sync + 'static {
    /// Component name used in errors, event topics and cache keys.
    const NAME: &'static str;

    fn register(self: Arc<Self>, ops: &mut OperationTable);
}

/// Marker for components whose operations only read state.
///
/// Results of a reader's operations may be cached: calling the same
/// operation twice with equal arguments must yield equal values.
pub trait Reader: Component {}
