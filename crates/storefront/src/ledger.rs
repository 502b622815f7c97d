//! Local order ledger.
//!
//! Append-only record of orders placed without the remote backend. Orders are
//! never edited or removed once recorded.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use rand::seq::IndexedRandom;
use serde::Serialize;
use shopfront_core::{Address, CartLine, CustomerId, Order, OrderId};
use tracing::{debug, info};

use crate::notify::{Listener, ListenerId, Listeners};
use crate::persistence::{self, KeyValueStore, Persisted};
use crate::pricing::PricingEngine;

const STORE: &str = "orders";

/// Prefix of locally generated order ids.
pub const LOCAL_ID_PREFIX: &str = "L-";
const LOCAL_ID_LEN: usize = 8;
/// Upper-case letters and digits without the look-alikes 0/O and 1/I.
const LOCAL_ID_CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Event delivered to ledger listeners when an order is recorded.
#[derive(Debug, Clone, Serialize)]
pub struct OrderPlaced {
    pub order: Order,
    /// Number of orders in the ledger after this one.
    pub order_count: usize,
}

/// The local order ledger.
pub struct OrderLedger {
    orders: Mutex<Vec<Order>>,
    pricing: PricingEngine,
    backing: Box<dyn KeyValueStore>,
    listeners: Listeners<OrderPlaced>,
}

impl OrderLedger {
    /// Open the ledger, restoring orders from `backing`. A missing or corrupt
    /// blob yields an empty ledger.
    #[must_use]
    pub fn open(backing: impl KeyValueStore + 'static, pricing: PricingEngine) -> Self {
        let orders: Vec<Order> = persistence::load_snapshot(&backing, STORE);
        debug!(orders = orders.len(), "Order ledger restored");

        Self {
            orders: Mutex::new(orders),
            pricing,
            backing: Box::new(backing),
            listeners: Listeners::new(STORE),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Order>> {
        self.orders.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record an order for `lines` with a fresh local id.
    ///
    /// The total is the grand total (discount and delivery included).
    pub fn place(
        &self,
        lines: Vec<CartLine>,
        address: Address,
        payment_method: impl Into<String>,
        customer_id: Option<CustomerId>,
    ) -> Persisted<Order> {
        let total = self.pricing.grand_total(&lines);

        let mut orders = self.lock();
        let taken: HashSet<&str> = orders.iter().map(|o| o.id().as_str()).collect();
        let id = generate_local_id(&taken);

        let order = Order::new(
            id,
            lines,
            total,
            Utc::now(),
            address,
            payment_method.into(),
            customer_id,
        );
        orders.push(order.clone());

        let status = persistence::save_snapshot(self.backing.as_ref(), STORE, orders.as_slice());
        let event = OrderPlaced {
            order: order.clone(),
            order_count: orders.len(),
        };
        drop(orders);

        info!(order_id = %order.id(), total = %order.total(), "Local order recorded");
        self.listeners.notify(&event);

        Persisted {
            value: order,
            status,
        }
    }

    /// All orders, most recent first.
    #[must_use]
    pub fn all(&self) -> Vec<Order> {
        self.lock().iter().rev().cloned().collect()
    }

    /// The order with `id`, if recorded.
    #[must_use]
    pub fn get(&self, id: &OrderId) -> Option<Order> {
        self.lock().iter().find(|o| o.id() == id).cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Subscribe to newly recorded orders.
    pub fn register_listener(&self, listener: impl Listener<OrderPlaced> + 'static) -> ListenerId {
        self.listeners.register(listener)
    }

    /// Unsubscribe. Returns false if `id` was not registered.
    pub fn unregister_listener(&self, id: ListenerId) -> bool {
        self.listeners.unregister(id)
    }
}

impl std::fmt::Debug for OrderLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderLedger")
            .field("orders", &self.len())
            .field("listeners", &self.listeners)
            .finish_non_exhaustive()
    }
}

/// A short random id not in `taken`.
fn generate_local_id(taken: &HashSet<&str>) -> OrderId {
    let mut rng = rand::rng();
    loop {
        let suffix: String = (0..LOCAL_ID_LEN)
            .filter_map(|_| LOCAL_ID_CHARSET.choose(&mut rng))
            .map(|b| char::from(*b))
            .collect();
        let id = format!("{LOCAL_ID_PREFIX}{suffix}");
        if !taken.contains(id.as_str()) {
            return OrderId::new(id);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use shopfront_core::{Money, OrderStatus, ProductId};

    use super::*;
    use crate::notify::ListenerError;
    use crate::persistence::MemoryStore;
    use crate::pricing::PricingConfig;

    fn engine() -> PricingEngine {
        PricingEngine::new(PricingConfig {
            free_delivery_threshold: Money::from_units(50_000),
            delivery_fee: Money::from_units(500),
            ..PricingConfig::default()
        })
    }

    fn lines() -> Vec<CartLine> {
        vec![CartLine {
            product_id: ProductId::new(1),
            name: "Kettle".to_string(),
            unit_price: Money::from_units(1000),
            compare_unit_price: Money::from_units(1000),
            quantity: 2,
        }]
    }

    #[test]
    fn test_place_uses_grand_total() {
        let ledger = OrderLedger::open(MemoryStore::new(), engine());
        let placed = ledger.place(lines(), Address::default(), "cod", None);

        assert!(placed.status.is_saved());
        let order = placed.value;
        assert_eq!(order.total(), Money::from_units(2500));
        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.payment_method(), "cod");
        assert_eq!(order.item_count(), 2);
    }

    #[test]
    fn test_local_id_format() {
        let ledger = OrderLedger::open(MemoryStore::new(), engine());
        let id = ledger.place(lines(), Address::default(), "cod", None).value.id().clone();

        let suffix = id.as_str().strip_prefix(LOCAL_ID_PREFIX).unwrap();
        assert_eq!(suffix.len(), LOCAL_ID_LEN);
        assert!(suffix.bytes().all(|b| LOCAL_ID_CHARSET.contains(&b)));
    }

    #[test]
    fn test_all_is_most_recent_first_and_ids_are_distinct() {
        let ledger = OrderLedger::open(MemoryStore::new(), engine());
        let first = ledger.place(lines(), Address::default(), "cod", None).value;
        let second = ledger.place(lines(), Address::default(), "cod", None).value;

        let all = ledger.all();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id(), second.id());
        assert_eq!(all[1].id(), first.id());
        assert_ne!(first.id(), second.id());
        assert_eq!(ledger.get(first.id()), Some(first));
    }

    #[test]
    fn test_orders_survive_reopen() {
        let backing = Arc::new(MemoryStore::new());
        let placed = OrderLedger::open(Arc::clone(&backing), engine())
            .place(lines(), Address::default(), "cod", None)
            .value;

        let reopened = OrderLedger::open(Arc::clone(&backing), engine());
        assert_eq!(reopened.len(), 1);
        assert_eq!(reopened.get(placed.id()), Some(placed));
    }

    #[test]
    fn test_corrupt_ledger_starts_empty() {
        let ledger = OrderLedger::open(MemoryStore::with_blob("[{\"id\":"), engine());
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_failed_save_still_records_order() {
        let backing = Arc::new(MemoryStore::new());
        backing.set_read_only(true);
        let ledger = OrderLedger::open(Arc::clone(&backing), engine());

        let placed = ledger.place(lines(), Address::default(), "cod", None);
        assert!(!placed.status.is_saved());
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_listeners_are_isolated() {
        let ledger = OrderLedger::open(MemoryStore::new(), engine());
        let counts = Arc::new(Mutex::new(Vec::new()));

        ledger.register_listener(|_: &OrderPlaced| -> Result<(), ListenerError> { panic!("boom") });
        let sink = Arc::clone(&counts);
        let id = ledger.register_listener(move |e: &OrderPlaced| -> Result<(), ListenerError> {
            sink.lock().unwrap().push(e.order_count);
            Ok(())
        });

        ledger.place(lines(), Address::default(), "cod", None);
        assert!(ledger.unregister_listener(id));
        ledger.place(lines(), Address::default(), "cod", None);

        assert_eq!(*counts.lock().unwrap(), vec![1]);
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn test_generated_id_avoids_taken() {
        let existing = (0..50)
            .map(|_| generate_local_id(&HashSet::new()))
            .collect::<Vec<_>>();
        let taken: HashSet<&str> = existing.iter().map(OrderId::as_str).collect();
        let fresh = generate_local_id(&taken);
        assert!(!taken.contains(fresh.as_str()));
    }
}
