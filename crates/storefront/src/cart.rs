//! Cart store.
//!
//! The authoritative list of cart lines. Lines are unique by product and keep
//! insertion order for display. Every mutation is applied in memory, then
//! persisted (best-effort), then announced to listeners.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use shopfront_core::{CartLine, Product, ProductId};
use thiserror::Error;
use tracing::debug;

use crate::notify::{Listener, ListenerId, Listeners};
use crate::persistence::{self, KeyValueStore, WriteStatus};

const STORE: &str = "cart";

/// Errors from cart mutations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CartError {
    /// `add` was called with a quantity of zero.
    #[error("quantity must be at least 1")]
    ZeroQuantity,

    /// The requested quantity does not fit in a cart line.
    #[error("quantity too large for product {0}")]
    QuantityOverflow(ProductId),
}

/// What changed in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CartChange {
    Added { product_id: ProductId, quantity: u32 },
    QuantitySet { product_id: ProductId, quantity: u32 },
    Removed { product_id: ProductId },
    /// Placed lines were taken out; lines added meanwhile remain.
    Placed,
    Cleared,
}

/// Event delivered to cart listeners after a mutation.
#[derive(Debug, Clone, Serialize)]
pub struct CartEvent {
    pub change: CartChange,
    /// Cart contents after the change.
    pub lines: Vec<CartLine>,
}

/// The shopping cart.
pub struct CartStore {
    lines: Mutex<Vec<CartLine>>,
    backing: Box<dyn KeyValueStore>,
    listeners: Listeners<CartEvent>,
}

impl CartStore {
    /// Open the cart, restoring lines from `backing`.
    ///
    /// A missing or corrupt blob yields an empty cart. Restored lines with a
    /// zero quantity are dropped and duplicate products are merged.
    #[must_use]
    pub fn open(backing: impl KeyValueStore + 'static) -> Self {
        let restored: Vec<CartLine> = persistence::load_snapshot(&backing, STORE);
        let lines = normalize(restored);
        debug!(lines = lines.len(), "Cart restored");

        Self {
            lines: Mutex::new(lines),
            backing: Box::new(backing),
            listeners: Listeners::new(STORE),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<CartLine>> {
        self.lines.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Persist the mutated `lines`, release the lock, then notify.
    ///
    /// The lock is held across the save so that snapshots reach the backing
    /// store in mutation order.
    fn commit(&self, lines: MutexGuard<'_, Vec<CartLine>>, change: CartChange) -> WriteStatus {
        let status = persistence::save_snapshot(self.backing.as_ref(), STORE, lines.as_slice());
        let event = CartEvent {
            change,
            lines: lines.clone(),
        };
        drop(lines);

        debug!(change = ?event.change, "Cart updated");
        self.listeners.notify(&event);
        status
    }

    /// Add `quantity` units of `product`.
    ///
    /// Merges into the existing line for the product, otherwise appends a new
    /// line priced from the product's current fields.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::ZeroQuantity`] if `quantity` is zero and
    /// [`CartError::QuantityOverflow`] if the merged quantity would overflow.
    /// The cart is unchanged in both cases.
    pub fn add(&self, product: &Product, quantity: u32) -> Result<WriteStatus, CartError> {
        if quantity == 0 {
            return Err(CartError::ZeroQuantity);
        }

        let mut lines = self.lock();
        if let Some(line) = lines.iter_mut().find(|l| l.product_id == product.id) {
            line.quantity = line
                .quantity
                .checked_add(quantity)
                .ok_or(CartError::QuantityOverflow(product.id))?;
        } else {
            lines.push(CartLine::from_product(product, quantity));
        }

        let change = CartChange::Added {
            product_id: product.id,
            quantity,
        };
        Ok(self.commit(lines, change))
    }

    /// Remove the line for `product_id`, if any.
    ///
    /// Persists and notifies even when there was nothing to remove.
    pub fn remove(&self, product_id: ProductId) -> WriteStatus {
        let mut lines = self.lock();
        lines.retain(|l| l.product_id != product_id);
        self.commit(lines, CartChange::Removed { product_id })
    }

    /// Replace the quantity of an existing line.
    ///
    /// A quantity of zero or less removes the line. Setting a quantity for a
    /// product that is not in the cart leaves the cart unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::QuantityOverflow`] if `quantity` exceeds the line
    /// limit.
    pub fn set_quantity(
        &self,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<WriteStatus, CartError> {
        if quantity <= 0 {
            return Ok(self.remove(product_id));
        }
        let quantity =
            u32::try_from(quantity).map_err(|_| CartError::QuantityOverflow(product_id))?;

        let mut lines = self.lock();
        if let Some(line) = lines.iter_mut().find(|l| l.product_id == product_id) {
            line.quantity = quantity;
        }
        let change = CartChange::QuantitySet {
            product_id,
            quantity,
        };
        Ok(self.commit(lines, change))
    }

    /// Empty the cart.
    pub fn clear(&self) -> WriteStatus {
        let mut lines = self.lock();
        lines.clear();
        self.commit(lines, CartChange::Cleared)
    }

    /// Take the quantities of `placed` out of the cart.
    ///
    /// Lines that reach zero are dropped. Anything added after `placed` was
    /// snapshotted stays in the cart. With no concurrent edits this empties
    /// the cart and reports [`CartChange::Cleared`].
    pub fn remove_placed(&self, placed: &[CartLine]) -> WriteStatus {
        let mut lines = self.lock();
        for taken in placed {
            if let Some(line) = lines.iter_mut().find(|l| l.product_id == taken.product_id) {
                line.quantity = line.quantity.saturating_sub(taken.quantity);
            }
        }
        lines.retain(|l| l.quantity > 0);

        let change = if lines.is_empty() {
            CartChange::Cleared
        } else {
            CartChange::Placed
        };
        self.commit(lines, change)
    }

    /// A copy of the current lines in insertion order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<CartLine> {
        self.lock().clone()
    }

    /// The line for `product_id`, if present.
    #[must_use]
    pub fn line(&self, product_id: ProductId) -> Option<CartLine> {
        self.lock().iter().find(|l| l.product_id == product_id).cloned()
    }

    /// Σ quantities over all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.lock().iter().map(|l| u64::from(l.quantity)).sum()
    }

    /// Number of distinct lines.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Subscribe to cart changes.
    pub fn register_listener(&self, listener: impl Listener<CartEvent> + 'static) -> ListenerId {
        self.listeners.register(listener)
    }

    /// Unsubscribe. Returns false if `id` was not registered.
    pub fn unregister_listener(&self, id: ListenerId) -> bool {
        self.listeners.unregister(id)
    }
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore")
            .field("lines", &*self.lock())
            .field("listeners", &self.listeners)
            .finish_non_exhaustive()
    }
}

/// Drop zero-quantity lines and merge duplicate products, keeping the
/// position of the first occurrence.
fn normalize(restored: Vec<CartLine>) -> Vec<CartLine> {
    let mut lines: Vec<CartLine> = Vec::with_capacity(restored.len());
    for line in restored {
        if line.quantity == 0 {
            continue;
        }
        if let Some(existing) = lines.iter_mut().find(|l| l.product_id == line.product_id) {
            existing.quantity = existing.quantity.saturating_add(line.quantity);
        } else {
            lines.push(line);
        }
    }
    lines
}
