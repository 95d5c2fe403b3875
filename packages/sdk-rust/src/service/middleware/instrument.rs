//! Error normalization and result publication for one operation.
//!
//! [`InstrumentLayer`] sits directly around the raw operation body. On
//! success it publishes the value on the component's [`EventChannel`] before
//! handing it back; on failure it normalizes the error into a
//! [`DomainError`] attributed to the operation. Timing and outcome are
//! recorded in a `tracing` span.

use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use serde_json::Value;
use tower::{Layer, Service};
use tracing::{debug, debug_span, warn};
use vaultkit_core::{wrap, Args, DomainError, FailureOrigin, OperationDescriptor};

use crate::events::EventChannel;
use crate::service::outcome::Outcome;

// ---------------------------------------------------------------------------
// InstrumentLayer
// ---------------------------------------------------------------------------

/// Tower layer that publishes results and normalizes failures.
#[derive(Debug, Clone)]
pub struct InstrumentLayer {
    descriptor: OperationDescriptor,
    events: Arc<EventChannel>,
    fail_on_handler_error: bool,
}

impl InstrumentLayer {
    #[must_use]
    pub fn new(
        descriptor: OperationDescriptor,
        events: Arc<EventChannel>,
        fail_on_handler_error: bool,
    ) -> Self {
        Self {
            descriptor,
            events,
            fail_on_handler_error,
        }
    }
}

impl<S> Layer<S> for InstrumentLayer {
    type Service = InstrumentService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        InstrumentService {
            inner,
            descriptor: self.descriptor,
            events: Arc::clone(&self.events),
            fail_on_handler_error: self.fail_on_handler_error,
        }
    }
}

// ---------------------------------------------------------------------------
// InstrumentService
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct InstrumentService<S> {
    inner: S,
    descriptor: OperationDescriptor,
    events: Arc<EventChannel>,
    fail_on_handler_error: bool,
}

impl<S> Service<Args> for InstrumentService<S>
where
    S: Service<Args, Response = Value, Error = anyhow::Error, Future = Outcome<anyhow::Error>>,
{
    type Response = Value;
    type Error = DomainError;
    type Future = Outcome<DomainError>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        let descriptor = self.descriptor;
        self.inner
            .poll_ready(cx)
            .map_err(|e| wrap(&descriptor, FailureOrigin::Operation, e))
    }

    fn call(&mut self, args: Args) -> Self::Future {
        let descriptor = self.descriptor;
        let events = Arc::clone(&self.events);
        let fail_on_handler_error = self.fail_on_handler_error;

        let span = debug_span!(
            "operation",
            component = descriptor.component,
            operation = descriptor.operation,
        );
        let entered = span.enter();
        let start = Instant::now();

        let outcome = self.inner.call(args).map(move |result| {
            let settled = match result {
                Ok(value) => publish(&descriptor, &events, fail_on_handler_error, value),
                Err(error) => Err(wrap(&descriptor, FailureOrigin::Operation, error)),
            };

            #[allow(clippy::cast_possible_truncation)]
            let duration_us = start.elapsed().as_micros() as u64;
            match &settled {
                Ok(_) => debug!(duration_us, outcome = "ok", "operation complete"),
                Err(error) => debug!(duration_us, outcome = "error", %error, "operation complete"),
            }
            settled
        });

        drop(entered);
        outcome.in_span(span)
    }
}

fn publish(
    descriptor: &OperationDescriptor,
    events: &EventChannel,
    fail_on_handler_error: bool,
    value: Value,
) -> Result<Value, DomainError> {
    match events.publish(descriptor.operation, &value) {
        Ok(_) => Ok(value),
        Err(failures) if fail_on_handler_error => Err(DomainError::new(
            descriptor,
            FailureOrigin::EventHandler,
            failures.to_string(),
        )),
        Err(failures) => {
            warn!(
                component = descriptor.component,
                operation = descriptor.operation,
                error = %failures,
                "event handler failed; returning result anyway"
            );
            Ok(value)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
