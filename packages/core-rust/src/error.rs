//! The single failure type surfaced by instrumented operations.
//!
//! Raw failures inside operation bodies and event handlers are
//! [`anyhow::Error`]s. Before they leave an instrumented operation they are
//! normalized into a [`DomainError`] that names the component and operation
//! the caller invoked.
//!
//! Normalizing is idempotent: a `DomainError` already attributed to the same
//! operation passes through untouched. A `DomainError` raised by some other
//! operation (e.g. a nested call into another component) keeps its rendered
//! text as the message of the new error, so the chain reads
//! `VaultReader.get: Lens.getAssets: connection refused`.

use serde::Serialize;

use crate::descriptor::OperationDescriptor;

/// What failed inside the instrumented call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FailureOrigin {
    /// The operation body failed, immediately or after suspension.
    Operation,
    /// One or more event subscribers failed while the result was published.
    EventHandler,
    /// The cache store failed on lookup or population.
    CacheStore,
    /// The caller named an operation the component never declared.
    UnknownOperation,
    /// The resolved value did not decode into the type the caller asked for.
    Decode,
}

/// Normalized failure carrying `{component, operation, message}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{component}.{operation}{}: {message}", .origin.label())]
pub struct DomainError {
    pub component: String,
    pub operation: String,
    pub message: String,
    pub origin: FailureOrigin,
}

impl FailureOrigin {
    fn label(self) -> &'static str {
        match self {
            Self::EventHandler => " (event listener)",
            Self::CacheStore => " (cache)",
            Self::Operation | Self::UnknownOperation | Self::Decode => "",
        }
    }
}

impl DomainError {
    /// Builds an error directly from a message.
    #[must_use]
    pub fn new(
        descriptor: &OperationDescriptor,
        origin: FailureOrigin,
        message: impl Into<String>,
    ) -> Self {
        Self {
            component: descriptor.component.to_string(),
            operation: descriptor.operation.to_string(),
            message: message.into(),
            origin,
        }
    }

    /// Error for a call to an operation the component does not declare.
    #[must_use]
    pub fn unknown_operation(component: &str, operation: &str) -> Self {
        Self {
            component: component.to_string(),
            operation: operation.to_string(),
            message: format!("{component} has no operation named {operation:?}"),
            origin: FailureOrigin::UnknownOperation,
        }
    }

    /// Error for a call addressed to a component that is not registered.
    #[must_use]
    pub fn unknown_component(component: &str, operation: &str) -> Self {
        Self {
            component: component.to_string(),
            operation: operation.to_string(),
            message: format!("no component named {component:?} is registered"),
            origin: FailureOrigin::UnknownOperation,
        }
    }

    /// Whether this error is attributed to `descriptor`.
    #[must_use]
    pub fn is_attributed_to(&self, descriptor: &OperationDescriptor) -> bool {
        self.component == descriptor.component && self.operation == descriptor.operation
    }
}

/// Normalizes a raw failure into a [`DomainError`] attributed to `descriptor`.
///
/// - A `DomainError` already attributed to `descriptor` is returned unchanged.
/// - A `DomainError` from another operation is nested: its full text becomes
///   the new message.
/// - Anything else is rendered with its context chain (`{:#}`).
#[must_use]
pub fn wrap(
    descriptor: &OperationDescriptor,
    origin: FailureOrigin,
    error: anyhow::Error,
) -> DomainError {
    match error.downcast::<DomainError>() {
        Ok(domain) if domain.is_attributed_to(descriptor) => domain,
        Ok(foreign) => DomainError::new(descriptor, origin, foreign.to_string()),
        Err(raw) => DomainError::new(descriptor, origin, format!("{raw:#}")),
    }
}

/// [`wrap`] for an error that is already typed as a `DomainError`.
#[must_use]
pub fn rewrap(
    descriptor: &OperationDescriptor,
    origin: FailureOrigin,
    error: DomainError,
) -> DomainError {
    if error.is_attributed_to(descriptor) {
        error
    } else {
        DomainError::new(descriptor, origin, error.to_string())
    }
}
