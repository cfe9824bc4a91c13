//! One-shot handoff for the OAuth authorization code.
//!
//! The redirect page can be requested several times (reloads, prefetch,
//! favicon requests), possibly concurrently. The publisher side is cloned into
//! every request handler; the first non-empty code wins and all later
//! publishes are dropped. The waiter side is consumed by the single reader.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::oneshot;

/// How a wait on the channel resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelOutcome {
    /// The first published value.
    Delivered(String),
    /// The channel was closed before anything was published.
    Closed,
    /// Nothing arrived within the wait timeout.
    TimedOut,
}

/// Create a connected publisher/waiter pair.
pub fn secret_channel() -> (SecretPublisher, SecretWaiter) {
    let (tx, rx) = oneshot::channel();
    let publisher = SecretPublisher {
        slot: Arc::new(Mutex::new(Some(tx))),
    };
    (publisher, SecretWaiter { rx })
}

/// Writer side. Taking the sender out of the slot is the once-guard.
#[derive(Debug, Clone)]
pub struct SecretPublisher {
    slot: Arc<Mutex<Option<oneshot::Sender<String>>>>,
}

impl SecretPublisher {
    /// Deliver `value` if nothing has been delivered yet and the channel is
    /// still open. Returns `true` only for the call that won.
    pub fn publish(&self, value: impl Into<String>) -> bool {
        let sender = match self.slot.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        match sender {
            // A dropped waiter still counts as delivered: the slot is spent.
            Some(tx) => {
                let _ = tx.send(value.into());
                true
            }
            None => false,
        }
    }

    /// Close without publishing. A pending or future wait resolves to
    /// [`ChannelOutcome::Closed`]. No-op after a successful publish.
    pub fn close(&self) {
        let sender = match self.slot.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        drop(sender);
    }

    /// True once a value was published or the channel was closed.
    pub fn is_spent(&self) -> bool {
        match self.slot.lock() {
            Ok(slot) => slot.is_none(),
            Err(poisoned) => poisoned.into_inner().is_none(),
        }
    }
}

/// Reader side. Consumed by the single wait.
#[derive(Debug)]
pub struct SecretWaiter {
    rx: oneshot::Receiver<String>,
}

impl SecretWaiter {
    /// Block until a value is published, the channel closes, or `timeout`
    /// elapses. `None` waits without a bound.
    pub async fn wait(self, timeout: Option<Duration>) -> ChannelOutcome {
        let received = match timeout {
            Some(limit) => match tokio::time::timeout(limit, self.rx).await {
                Ok(received) => received,
                Err(_) => return ChannelOutcome::TimedOut,
            },
            None => self.rx.await,
        };
        match received {
            Ok(value) => ChannelOutcome::Delivered(value),
            Err(_) => ChannelOutcome::Closed,
        }
    }
}
