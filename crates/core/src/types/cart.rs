//! Cart line type.

use serde::{Deserialize, Serialize};

use super::catalog::Product;
use super::id::ProductId;
use super::money::Money;

/// One product entry in the cart.
///
/// Prices are captured from the product when the line is first created.
/// `quantity` is always at least one while the line is in a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    #[serde(default)]
    pub name: String,
    pub unit_price: Money,
    pub compare_unit_price: Money,
    pub quantity: u32,
}

impl CartLine {
    /// Create a line for `quantity` units of `product`.
    #[must_use]
    pub fn from_product(product: &Product, quantity: u32) -> Self {
        Self {
            product_id: product.id,
            name: product.name.clone(),
            unit_price: product.unit_price,
            compare_unit_price: product.compare_unit_price,
            quantity,
        }
    }

    /// `unit_price × quantity`.
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.unit_price * self.quantity
    }

    /// `max(0, compare_unit_price − unit_price) × quantity`.
    #[must_use]
    pub fn markdown_total(&self) -> Money {
        self.compare_unit_price.saturating_sub(self.unit_price) * self.quantity
    }
}
