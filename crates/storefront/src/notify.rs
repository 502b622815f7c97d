//! Listener fan-out shared by the cart, ledger and wishlist stores.
//!
//! Listeners run in registration order. A listener that returns an error or
//! panics is logged and skipped; the remaining listeners still run and the
//! store that triggered the notification keeps its already-applied mutation.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tracing::error;

/// Error returned by a listener to signal that it could not handle an event.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ListenerError(pub String);

impl ListenerError {
    /// Create an error from any message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Receives events from a store.
pub trait Listener<E>: Send + Sync {
    /// Handle one event.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener could not handle the event. The error
    /// is logged by the store and does not affect other listeners.
    fn on_event(&self, event: &E) -> Result<(), ListenerError>;
}

impl<E, F> Listener<E> for F
where
    F: Fn(&E) -> Result<(), ListenerError> + Send + Sync,
{
    fn on_event(&self, event: &E) -> Result<(), ListenerError> {
        self(event)
    }
}

/// Handle returned by [`Listeners::register`], used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

type Entry<E> = (ListenerId, Arc<dyn Listener<E>>);

/// Ordered set of listeners for one store.
pub struct Listeners<E> {
    store: &'static str,
    next_id: AtomicU64,
    entries: Mutex<Vec<Entry<E>>>,
}

impl<E> Listeners<E> {
    /// Create an empty registry. `store` names the owning store in logs.
    #[must_use]
    pub const fn new(store: &'static str) -> Self {
        Self {
            store,
            next_id: AtomicU64::new(1),
            entries: Mutex::new(Vec::new()),
        }
    }

    fn entries(&self) -> MutexGuard<'_, Vec<Entry<E>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a listener at the end of the notification order.
    pub fn register(&self, listener: impl Listener<E> + 'static) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.entries().push((id, Arc::new(listener)));
        id
    }

    /// Remove a listener. Returns false if it was not registered.
    pub fn unregister(&self, id: ListenerId) -> bool {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        entries.len() != before
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    /// Returns true if no listener is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Deliver `event` to every listener, returning how many failed.
    ///
    /// The registry lock is not held while listeners run, so a listener may
    /// register, unregister, or call back into its store.
    pub fn notify(&self, event: &E) -> usize {
        let listeners: Vec<Entry<E>> = self
            .entries()
            .iter()
            .map(|(id, listener)| (*id, Arc::clone(listener)))
            .collect();

        let mut failures = 0;
        for (id, listener) in listeners {
            match panic::catch_unwind(AssertUnwindSafe(|| listener.on_event(event))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    failures += 1;
                    error!(store = self.store, listener = %id, error = %e, "Listener failed");
                }
                Err(payload) => {
                    failures += 1;
                    error!(
                        store = self.store,
                        listener = %id,
                        panic = %panic_message(payload.as_ref()),
                        "Listener panicked"
                    );
                }
            }
        }
        failures
    }
}

impl<E> fmt::Debug for Listeners<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners")
            .field("store", &self.store)
            .field("len", &self.len())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "(non-string panic payload)".to_string())
}
