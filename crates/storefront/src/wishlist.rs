//! Wishlist store.
//!
//! A set of product ids, kept in the order they were added.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use shopfront_core::ProductId;
use tracing::debug;

use crate::notify::{Listener, ListenerId, Listeners};
use crate::persistence::{self, KeyValueStore, Persisted};

const STORE: &str = "wishlist";

/// Event delivered to wishlist listeners after a toggle.
#[derive(Debug, Clone, Serialize)]
pub struct WishlistEvent {
    pub product_id: ProductId,
    /// Whether the product is on the wishlist after the toggle.
    pub present: bool,
    pub ids: Vec<ProductId>,
}

/// The wishlist.
pub struct WishlistStore {
    ids: Mutex<Vec<ProductId>>,
    backing: Box<dyn KeyValueStore>,
    listeners: Listeners<WishlistEvent>,
}

impl WishlistStore {
    /// Open the wishlist, restoring ids from `backing`. Duplicates in the
    /// persisted blob are dropped.
    #[must_use]
    pub fn open(backing: impl KeyValueStore + 'static) -> Self {
        let restored: Vec<ProductId> = persistence::load_snapshot(&backing, STORE);
        let mut ids = Vec::with_capacity(restored.len());
        for id in restored {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        debug!(items = ids.len(), "Wishlist restored");

        Self {
            ids: Mutex::new(ids),
            backing: Box::new(backing),
            listeners: Listeners::new(STORE),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ProductId>> {
        self.ids.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add `product_id` if absent, remove it if present. Returns whether it
    /// is present afterwards.
    pub fn toggle(&self, product_id: ProductId) -> Persisted<bool> {
        let mut ids = self.lock();
        let present = if let Some(pos) = ids.iter().position(|id| *id == product_id) {
            ids.remove(pos);
            false
        } else {
            ids.push(product_id);
            true
        };

        let status = persistence::save_snapshot(self.backing.as_ref(), STORE, ids.as_slice());
        let event = WishlistEvent {
            product_id,
            present,
            ids: ids.clone(),
        };
        drop(ids);

        debug!(%product_id, present, "Wishlist toggled");
        self.listeners.notify(&event);

        Persisted {
            value: present,
            status,
        }
    }

    #[must_use]
    pub fn is_present(&self, product_id: ProductId) -> bool {
        self.lock().contains(&product_id)
    }

    /// Every id on the wishlist, oldest first.
    #[must_use]
    pub fn all_ids(&self) -> Vec<ProductId> {
        self.lock().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Subscribe to wishlist changes.
    pub fn register_listener(&self, listener: impl Listener<WishlistEvent> + 'static) -> ListenerId {
        self.listeners.register(listener)
    }

    /// Unsubscribe. Returns false if `id` was not registered.
    pub fn unregister_listener(&self, id: ListenerId) -> bool {
        self.listeners.unregister(id)
    }
}

impl std::fmt::Debug for WishlistStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WishlistStore")
            .field("ids", &*self.lock())
            .field("listeners", &self.listeners)
            .finish_non_exhaustive()
    }
}
