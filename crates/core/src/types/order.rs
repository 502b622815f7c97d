//! Locally recorded order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::address::Address;
use super::cart::CartLine;
use super::id::{CustomerId, OrderId};
use super::money::Money;
use super::status::OrderStatus;

/// An order recorded in the local ledger.
///
/// The id and line snapshot are fixed at creation. Fields are private so an
/// `Order` handed out by the ledger cannot be edited in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    lines: Vec<CartLine>,
    total: Money,
    placed_at: DateTime<Utc>,
    address: Address,
    payment_method: String,
    customer_id: Option<CustomerId>,
    status: OrderStatus,
}

impl Order {
    /// Create a pending order.
    #[must_use]
    pub const fn new(
        id: OrderId,
        lines: Vec<CartLine>,
        total: Money,
        placed_at: DateTime<Utc>,
        address: Address,
        payment_method: String,
        customer_id: Option<CustomerId>,
    ) -> Self {
        Self {
            id,
            lines,
            total,
            placed_at,
            address,
            payment_method,
            customer_id,
            status: OrderStatus::Pending,
        }
    }

    #[must_use]
    pub const fn id(&self) -> &OrderId {
        &self.id
    }

    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub const fn total(&self) -> Money {
        self.total
    }

    #[must_use]
    pub const fn placed_at(&self) -> DateTime<Utc> {
        self.placed_at
    }

    #[must_use]
    pub const fn address(&self) -> &Address {
        &self.address
    }

    #[must_use]
    pub fn payment_method(&self) -> &str {
        &self.payment_method
    }

    #[must_use]
    pub const fn customer_id(&self) -> Option<CustomerId> {
        self.customer_id
    }

    #[must_use]
    pub const fn status(&self) -> OrderStatus {
        self.status
    }

    /// Σ quantities over the order's lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.lines.iter().map(|line| u64::from(line.quantity)).sum()
    }
}
