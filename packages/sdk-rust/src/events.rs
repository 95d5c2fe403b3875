//! Per-instance publish/subscribe channel for operation results.
//!
//! Every instrumented component owns one [`EventChannel`]. When an operation
//! completes successfully its result is published under the operation's name;
//! subscribers registered for that name (and wildcard subscribers) run
//! synchronously, in subscription order.
//!
//! A failing handler does not stop delivery. All failures of one publish are
//! collected into [`HandlerFailures`] and returned once every handler ran.
//! A handler that panics counts as a failure.
//!
//! The subscriber list is copy-on-write: a publish iterates the snapshot taken
//! when it started, so handlers may subscribe or unsubscribe while running.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use serde_json::Value;

/// Handle ids are unique across all channels in the process, so a handle
/// from one channel never removes a subscriber from another.
static NEXT_SUBSCRIPTION_ID: AtomicU64 = AtomicU64::new(1);

/// One published result.
#[derive(Debug, Clone, Copy)]
pub struct Event<'a> {
    /// Name of the operation that produced the payload.
    pub operation: &'a str,
    /// The operation's resolved value.
    pub payload: &'a Value,
}

/// Subscriber callback. Returning an error reports a handler failure to the
/// publishing operation.
pub type EventHandler = Arc<dyn Fn(&Event<'_>) -> anyhow::Result<()> + Send + Sync>;

/// Opaque token returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
enum Topic {
    Operation(String),
    All,
}

impl Topic {
    fn matches(&self, operation: &str) -> bool {
        match self {
            Self::Operation(name) => name == operation,
            Self::All => true,
        }
    }
}

struct Subscription {
    id: u64,
    topic: Topic,
    handler: EventHandler,
}

/// Failures raised by handlers during one publish, in handler order.
#[derive(Debug)]
pub struct HandlerFailures {
    pub operation: String,
    pub errors: Vec<anyhow::Error>,
}

impl fmt::Display for HandlerFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.errors.len();
        write!(
            f,
            "{count} handler{} failed for {}",
            if count == 1 { "" } else { "s" },
            self.operation
        )?;
        for (i, error) in self.errors.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{sep}{error:#}")?;
        }
        Ok(())
    }
}

impl std::error::Error for HandlerFailures {}

/// Per-instance publish/subscribe channel.
pub struct EventChannel {
    subscribers: ArcSwap<Vec<Arc<Subscription>>>,
}

impl EventChannel {
    #[must_use]
    pub fn new() -> Self {
        Self {
            subscribers: ArcSwap::from_pointee(Vec::new()),
        }
    }

    /// Subscribes `handler` to results of `operation`.
    pub fn subscribe<F>(&self, operation: impl Into<String>, handler: F) -> SubscriptionHandle
    where
        F: Fn(&Event<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.insert(Topic::Operation(operation.into()), Arc::new(handler))
    }

    /// Subscribes `handler` to results of every operation.
    pub fn subscribe_all<F>(&self, handler: F) -> SubscriptionHandle
    where
        F: Fn(&Event<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.insert(Topic::All, Arc::new(handler))
    }

    /// Removes a subscription. Returns `false` if it was not subscribed here
    /// (already removed, or issued by another channel).
    pub fn unsubscribe(&self, handle: SubscriptionHandle) -> bool {
        let previous = self.subscribers.rcu(|current| {
            current
                .iter()
                .filter(|s| s.id != handle.0)
                .cloned()
                .collect::<Vec<_>>()
        });
        previous.iter().any(|s| s.id == handle.0)
    }

    /// Number of subscribers that would receive an event for `operation`.
    #[must_use]
    pub fn subscriber_count(&self, operation: &str) -> usize {
        self.subscribers
            .load()
            .iter()
            .filter(|s| s.topic.matches(operation))
            .count()
    }

    /// Delivers `payload` to every subscriber of `operation`, in subscription
    /// order. Returns how many handlers ran.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerFailures`] if at least one handler failed. Handlers
    /// after a failing one still run.
    pub fn publish(&self, operation: &str, payload: &Value) -> Result<usize, HandlerFailures> {
        let snapshot = self.subscribers.load_full();
        let event = Event { operation, payload };
        let mut delivered = 0;
        let mut errors = Vec::new();

        for subscription in snapshot.iter().filter(|s| s.topic.matches(operation)) {
            delivered += 1;
            match panic::catch_unwind(AssertUnwindSafe(|| (subscription.handler)(&event))) {
                Ok(Ok(())) => {}
                Ok(Err(error)) => errors.push(error),
                Err(payload) => errors.push(anyhow::anyhow!(
                    "handler panicked: {}",
                    panic_message(payload.as_ref())
                )),
            }
        }

        if errors.is_empty() {
            Ok(delivered)
        } else {
            Err(HandlerFailures {
                operation: operation.to_string(),
                errors,
            })
        }
    }

    fn insert(&self, topic: Topic, handler: EventHandler) -> SubscriptionHandle {
        let id = NEXT_SUBSCRIPTION_ID.fetch_add(1, Ordering::Relaxed);
        let subscription = Arc::new(Subscription { id, topic, handler });
        self.subscribers.rcu(|current| {
            let mut next = Vec::clone(current);
            next.push(Arc::clone(&subscription));
            next
        });
        SubscriptionHandle(id)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string payload"
    }
}

impl Default for EventChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventChannel")
            .field("subscribers", &self.subscribers.load().len())
            .finish()
    }
}
