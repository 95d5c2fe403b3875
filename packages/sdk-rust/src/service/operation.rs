//! Operation declaration: the table a component fills in at construction.
//!
//! Components do not get their operations discovered by reflection. Each
//! component lists its public operations in [`Component::register`]
//! (crate::service::Component) by adding entries to an [`OperationTable`].
//! Every entry becomes a [`RawOperation`], a `tower::Service<Args>` around
//! the body, which the middleware layers then wrap.

use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::task::{Context, Poll};

use anyhow::Context as _;
use serde::Serialize;
use serde_json::Value;
use tower::Service;
use vaultkit_core::{Args, NameError, OperationDescriptor};

use super::outcome::{CallKind, Outcome};

/// Type-erased operation body.
pub type OperationBody = Arc<dyn Fn(Args) -> Outcome<anyhow::Error> + Send + Sync>;

/// Errors detected while a component declares its operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
    #[error(transparent)]
    InvalidName(#[from] NameError),
    #[error("{component} declares operation {operation:?} more than once")]
    DuplicateOperation {
        component: &'static str,
        operation: &'static str,
    },
}

/// A declared operation before instrumentation.
pub struct OperationEntry {
    pub descriptor: OperationDescriptor,
    pub kind: CallKind,
    pub raw: RawOperation,
}

impl fmt::Debug for OperationEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationEntry")
            .field("descriptor", &self.descriptor)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Collects the public operations of one component.
pub struct OperationTable {
    component: &'static str,
    entries: Vec<OperationEntry>,
    seen: HashSet<&'static str>,
    error: Option<RegistrationError>,
}

impl OperationTable {
    #[must_use]
    pub fn new(component: &'static str) -> Self {
        Self {
            component,
            entries: Vec::new(),
            seen: HashSet::new(),
            error: None,
        }
    }

    /// Declares an operation whose result is available when the call
    /// returns.
    pub fn immediate<T, F>(&mut self, name: &'static str, body: F) -> &mut Self
    where
        F: Fn(Args) -> anyhow::Result<T> + Send + Sync + 'static,
        T: Serialize,
    {
        self.raw(name, CallKind::Immediate, move |args| {
            Outcome::ready(body(args).and_then(to_value))
        })
    }

    /// Declares an operation that suspends and resolves later.
    pub fn deferred<T, F, Fut>(&mut self, name: &'static str, body: F) -> &mut Self
    where
        F: Fn(Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
        T: Serialize,
    {
        self.raw(name, CallKind::Deferred, move |args| {
            let fut = body(args);
            Outcome::pending(async move { fut.await.and_then(to_value) })
        })
    }

    /// Declares an operation from a body that builds its own [`Outcome`],
    /// e.g. one that validates arguments synchronously before suspending.
    pub fn raw<F>(&mut self, name: &'static str, kind: CallKind, body: F) -> &mut Self
    where
        F: Fn(Args) -> Outcome<anyhow::Error> + Send + Sync + 'static,
    {
        if self.error.is_some() {
            return self;
        }
        let descriptor = match OperationDescriptor::new(self.component, name) {
            Ok(descriptor) => descriptor,
            Err(e) => {
                self.error = Some(e.into());
                return self;
            }
        };
        if !self.seen.insert(name) {
            self.error = Some(RegistrationError::DuplicateOperation {
                component: self.component,
                operation: name,
            });
            return self;
        }
        self.entries.push(OperationEntry {
            descriptor,
            kind,
            raw: RawOperation {
                body: Arc::new(body),
            },
        });
        self
    }

    /// Consumes the table, returning entries in declaration order.
    ///
    /// # Errors
    ///
    /// Returns the first [`RegistrationError`] recorded while declaring.
    pub fn finish(self) -> Result<Vec<OperationEntry>, RegistrationError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.entries),
        }
    }
}

fn to_value<T: Serialize>(value: T) -> anyhow::Result<Value> {
    serde_json::to_value(value).context("operation result is not representable as JSON")
}

// ---------------------------------------------------------------------------
// RawOperation
// ---------------------------------------------------------------------------

/// Uninstrumented operation body as a tower service. Always ready.
#[derive(Clone)]
pub struct RawOperation {
    body: OperationBody,
}

impl RawOperation {
    pub fn new<F>(body: F) -> Self
    where
        F: Fn(Args) -> Outcome<anyhow::Error> + Send + Sync + 'static,
    {
        Self {
            body: Arc::new(body),
        }
    }
}

impl fmt::Debug for RawOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawOperation").finish_non_exhaustive()
    }
}

impl Service<Args> for RawOperation {
    type Response = Value;
    type Error = anyhow::Error;
    type Future = Outcome<anyhow::Error>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, args: Args) -> Self::Future {
        (self.body)(args)
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;
    use serde_json::json;
    use tower::ServiceExt;
    use vaultkit_core::args;

    use super::*;

    #[test]
    fn entries_keep_declaration_order_and_kind() {
        let mut table = OperationTable::new("Lens");
        table
            .deferred("getAssets", |_| async { Ok(vec!["0x1"]) })
            .immediate("addressOf", |_| Ok("0xFa58"));
        let entries = table.finish().unwrap();

        let names: Vec<_> = entries.iter().map(|e| e.descriptor.operation).collect();
        assert_eq!(names, vec!["getAssets", "addressOf"]);
        assert_eq!(entries[0].kind, CallKind::Deferred);
        assert_eq!(entries[1].kind, CallKind::Immediate);
        assert_eq!(entries[0].descriptor.component, "Lens");
    }

    #[test]
    fn duplicate_operation_is_rejected() {
        let mut table = OperationTable::new("Lens");
        table
            .immediate("get", |_| Ok(1))
            .immediate("get", |_| Ok(2));
        assert_eq!(
            table.finish().unwrap_err(),
            RegistrationError::DuplicateOperation {
                component: "Lens",
                operation: "get"
            }
        );
    }

    #[test]
    fn entry_debug_names_the_operation() {
        let mut table = OperationTable::new("Lens");
        table.immediate("get", |_| Ok(1));
        let rendered = format!("{:?}", table.finish().unwrap());
        assert!(rendered.contains("get"), "{rendered}");
        assert!(rendered.contains("Immediate"), "{rendered}");
    }

    #[test]
    fn invalid_operation_name_is_rejected() {
        let mut table = OperationTable::new("Lens");
        table.immediate("get.assets", |_| Ok(1));
        assert!(matches!(
            table.finish().unwrap_err(),
            RegistrationError::InvalidName(NameError { kind: "operation", .. })
        ));
    }

    #[tokio::test]
    async fn raw_operation_serializes_result() {
        let mut table = OperationTable::new("Lens");
        table.deferred("getAssets", |args: Args| async move {
            let owner: String = args.arg(0)?;
            Ok(vec![owner])
        });
        let mut entries = table.finish().unwrap();
        let entry = entries.remove(0);

        let value = entry.raw.oneshot(args!["0xabc"]).await.unwrap();
        assert_eq!(value, json!(["0xabc"]));
    }

    #[test]
    fn immediate_body_failure_is_ready_error() {
        let mut svc = RawOperation::new(|_| Outcome::err(anyhow!("boom")));
        let outcome = svc.call(args![]);
        assert!(outcome.is_ready());
        assert!(outcome.try_now().unwrap().is_err());
    }
}
