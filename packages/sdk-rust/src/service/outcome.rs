//! Calling convention of an operation call.
//!
//! An operation either produces its result immediately or suspends and
//! resolves later. [`Outcome`] carries either shape and is itself a
//! [`Future`], so callers can always `.await` it. Callers of immediate
//! operations can also take the value synchronously with [`Outcome::try_now`].
//!
//! Instrumentation layers preserve the shape they receive: an immediate
//! result stays immediate, a suspended one stays suspended.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use serde_json::Value;
use tracing::Instrument;
use vaultkit_core::DomainError;

/// Boxed future of a suspended operation.
pub type OutcomeFuture<E> = Pin<Box<dyn Future<Output = Result<Value, E>> + Send + 'static>>;

/// Declared calling convention of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    /// Result is available when the call returns.
    Immediate,
    /// Result is delivered through a suspended computation.
    Deferred,
}

enum State<E> {
    Ready(Option<Result<Value, E>>),
    Pending(OutcomeFuture<E>),
}

/// Result of calling an operation: immediate or suspended.
#[must_use = "an Outcome does nothing unless awaited or taken with `try_now`"]
pub struct Outcome<E = DomainError> {
    state: State<E>,
}

impl<E> Outcome<E> {
    /// An immediate outcome.
    pub fn ready(result: Result<Value, E>) -> Self {
        Self {
            state: State::Ready(Some(result)),
        }
    }

    pub fn ok(value: Value) -> Self {
        Self::ready(Ok(value))
    }

    pub fn err(error: E) -> Self {
        Self::ready(Err(error))
    }

    /// A suspended outcome resolved by `future`.
    pub fn pending<F>(future: F) -> Self
    where
        F: Future<Output = Result<Value, E>> + Send + 'static,
    {
        Self {
            state: State::Pending(Box::pin(future)),
        }
    }

    /// Delivers `result` using the given calling convention: immediately for
    /// [`CallKind::Immediate`], through an already-resolved suspension for
    /// [`CallKind::Deferred`].
    pub fn deliver(kind: CallKind, result: Result<Value, E>) -> Self
    where
        E: Send + 'static,
    {
        match kind {
            CallKind::Immediate => Self::ready(result),
            CallKind::Deferred => Self::pending(std::future::ready(result)),
        }
    }

    /// Lifts an immediate outcome into a resolved suspension when `kind` is
    /// [`CallKind::Deferred`]. A suspended outcome cannot be made immediate
    /// and is returned unchanged.
    pub fn conform(self, kind: CallKind) -> Self
    where
        E: Send + 'static,
    {
        match (kind, self.state) {
            (CallKind::Deferred, State::Ready(Some(result))) => Self::deliver(kind, result),
            (_, state) => Self { state },
        }
    }

    /// The shape of this outcome.
    pub fn kind(&self) -> CallKind {
        match self.state {
            State::Ready(_) => CallKind::Immediate,
            State::Pending(_) => CallKind::Deferred,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.kind() == CallKind::Immediate
    }

    pub fn is_pending(&self) -> bool {
        self.kind() == CallKind::Deferred
    }

    /// Takes an immediate result, or hands the outcome back if it is
    /// suspended (or was already consumed by polling).
    ///
    /// # Errors
    ///
    /// Returns `Err(self)` when no immediate result is available.
    pub fn try_now(self) -> Result<Result<Value, E>, Self> {
        match self.state {
            State::Ready(Some(result)) => Ok(result),
            state => Err(Self { state }),
        }
    }

    /// Applies `f` to the eventual result, keeping the calling convention.
    ///
    /// For an immediate outcome `f` runs now; for a suspended one it runs
    /// when the suspension resolves, before the value reaches the caller.
    pub fn map<E2, F>(self, f: F) -> Outcome<E2>
    where
        F: FnOnce(Result<Value, E>) -> Result<Value, E2> + Send + 'static,
        E: 'static,
        E2: 'static,
    {
        match self.state {
            State::Ready(Some(result)) => Outcome::ready(f(result)),
            State::Ready(None) => Outcome {
                state: State::Ready(None),
            },
            State::Pending(future) => Outcome::pending(async move { f(future.await) }),
        }
    }

    /// Runs a suspended outcome inside `span`. Immediate outcomes are
    /// returned unchanged.
    pub fn in_span(self, span: tracing::Span) -> Self
    where
        E: 'static,
    {
        match self.state {
            State::Pending(future) => Self {
                state: State::Pending(Box::pin(future.instrument(span))),
            },
            ready @ State::Ready(_) => Self { state: ready },
        }
    }
}

impl<E: Unpin> Future for Outcome<E> {
    type Output = Result<Value, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.get_mut().state {
            State::Ready(slot) => Poll::Ready(slot.take().expect("Outcome polled after completion")),
            State::Pending(future) => future.as_mut().poll(cx),
        }
    }
}

impl<E> std::fmt::Debug for Outcome<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Outcome").field("kind", &self.kind()).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use serde_json::json;

    use super::*;

    #[test]
    fn ready_outcome_can_be_taken_synchronously() {
        let outcome: Outcome<String> = Outcome::ok(json!(1));
        assert!(outcome.is_ready());
        assert_eq!(outcome.try_now().unwrap().unwrap(), json!(1));
    }

    #[test]
    fn pending_outcome_is_handed_back() {
        let outcome: Outcome<String> = Outcome::pending(async { Ok(json!(1)) });
        let back = outcome.try_now().unwrap_err();
        assert!(back.is_pending());
    }

    #[test]
    fn deliver_follows_call_kind() {
        assert!(Outcome::<String>::deliver(CallKind::Immediate, Ok(json!(1))).is_ready());
        assert!(Outcome::<String>::deliver(CallKind::Deferred, Ok(json!(1))).is_pending());
    }

    #[tokio::test]
    async fn conform_lifts_ready_into_deferred() {
        let lifted = Outcome::<String>::ok(json!(1)).conform(CallKind::Deferred);
        assert!(lifted.is_pending());
        assert_eq!(lifted.await.unwrap(), json!(1));

        assert!(Outcome::<String>::ok(json!(1)).conform(CallKind::Immediate).is_ready());
        let pending = Outcome::<String>::pending(async { Ok(json!(1)) });
        assert!(pending.conform(CallKind::Immediate).is_pending());
    }

    #[tokio::test]
    async fn ready_outcome_is_awaitable() {
        let outcome: Outcome<String> = Outcome::err("boom".to_string());
        assert_eq!(outcome.await.unwrap_err(), "boom");
    }

    #[test]
    fn map_on_ready_runs_immediately() {
        let ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran);
        let mapped: Outcome<u8> = Outcome::<String>::ok(json!(2)).map(move |r| {
            flag.store(true, Ordering::SeqCst);
            r.map_err(|_| 0)
        });
        assert!(ran.load(Ordering::SeqCst));
        assert!(mapped.is_ready());
    }

    #[tokio::test]
    async fn map_on_pending_runs_on_resolution() {
        let ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran);
        let mapped: Outcome<String> = Outcome::<String>::pending(async { Ok(json!(2)) }).map(
            move |r| {
                flag.store(true, Ordering::SeqCst);
                r.map(|v| json!(v.as_i64().unwrap_or_default() * 10))
            },
        );
        assert!(mapped.is_pending());
        assert!(!ran.load(Ordering::SeqCst));
        assert_eq!(mapped.await.unwrap(), json!(20));
        assert!(ran.load(Ordering::SeqCst));
    }
}
