//! Catalog types as returned by the remote commerce backend.
//!
//! The storefront only reads these; it never mutates a [`Product`].

use serde::{Deserialize, Serialize};

use super::address::Address;
use super::id::{CategoryId, CustomerId, ProductId};
use super::money::Money;

/// A sellable product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// Price the customer pays per unit.
    pub unit_price: Money,
    /// Reference (MRP) price per unit. Equal to `unit_price` when the
    /// product is not marked down.
    pub compare_unit_price: Money,
    /// Price paid to the supplier, when the backend exposes it.
    #[serde(default)]
    pub transfer_price: Option<Money>,
    /// Displayed stock counter. Not reserved or reconciled.
    #[serde(default)]
    pub stock_quantity: Option<i64>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub category_ids: Vec<CategoryId>,
}

impl Product {
    /// Per-unit markdown, never negative.
    #[must_use]
    pub fn markdown(&self) -> Money {
        self.compare_unit_price.saturating_sub(self.unit_price)
    }
}

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    /// Parent category, `None` for top-level categories.
    pub parent: Option<CategoryId>,
    /// Number of published products in the category.
    pub count: u64,
    pub image_url: Option<String>,
}

/// A payment method offered by the backend.
///
/// The id is passed through to order creation untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub id: String,
    pub title: String,
    pub description: String,
}

/// A customer account on the remote backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub billing: Option<Address>,
    pub shipping: Option<Address>,
}

/// Fields for creating or updating a customer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerDraft {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub billing: Option<Address>,
    pub shipping: Option<Address>,
}

/// One page of a paginated listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based page number that was requested.
    pub page: u32,
    pub per_page: u32,
    /// Total matching items, if the backend reported it.
    pub total: Option<u64>,
    /// Total pages, if the backend reported it.
    pub total_pages: Option<u32>,
}

impl<T> Page<T> {
    /// Returns true if the backend reported more pages after this one.
    #[must_use]
    pub fn has_next(&self) -> bool {
        self.total_pages.is_some_and(|pages| self.page < pages)
    }
}
