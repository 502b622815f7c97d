//! Cart route handlers.
//!
//! Every handler responds with the full cart view so clients can re-render
//! from a single response. Amounts in the view are truncated to whole
//! currency units.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use shopfront_core::{CartLine, Money, ProductId};
use tracing::instrument;

use super::blocking;
use crate::cart::CartError;
use crate::error::{Result, add_breadcrumb};
use crate::persistence::WriteStatus;
use crate::pricing::Totals;
use crate::state::AppState;

/// Cart line display data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartLineView {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Money,
    pub compare_unit_price: Money,
    pub quantity: u32,
    pub line_total: Money,
}

impl From<&CartLine> for CartLineView {
    fn from(line: &CartLine) -> Self {
        Self {
            product_id: line.product_id,
            name: line.name.clone(),
            unit_price: line.unit_price,
            compare_unit_price: line.compare_unit_price,
            quantity: line.quantity,
            line_total: line.line_total().whole_units(),
        }
    }
}

/// Cart display data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartView {
    pub lines: Vec<CartLineView>,
    pub item_count: u64,
    pub totals: Totals,
    /// Whether the mutation that produced this view reached storage.
    /// Absent on plain reads.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved: Option<bool>,
}

impl CartView {
    /// The cart as it is now.
    #[must_use]
    pub fn current(state: &AppState) -> Self {
        let lines = state.cart().snapshot();
        Self {
            item_count: lines.iter().map(|l| u64::from(l.quantity)).sum(),
            totals: state.pricing().totals(&lines).presented(),
            lines: lines.iter().map(CartLineView::from).collect(),
            saved: None,
        }
    }

    /// The cart after a mutation that ended with `status`.
    #[must_use]
    pub fn after(state: &AppState, status: &WriteStatus) -> Self {
        Self {
            saved: Some(status.is_saved()),
            ..Self::current(state)
        }
    }
}

/// Add-to-cart request body.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: ProductId,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

const fn default_quantity() -> u32 {
    1
}

/// Quantity update request body.
#[derive(Debug, Deserialize)]
pub struct UpdateQuantityForm {
    pub quantity: i64,
}

/// Display the cart.
#[allow(clippy::unused_async)]
pub async fn show(State(state): State<AppState>) -> Json<CartView> {
    Json(CartView::current(&state))
}

/// Add a product to the cart.
///
/// The product is looked up through the catalog so the line is priced from
/// current (possibly cached) product data.
#[instrument(skip(state, form), fields(product_id = %form.product_id, quantity = form.quantity))]
pub async fn add(
    State(state): State<AppState>,
    Json(form): Json<AddToCartForm>,
) -> Result<Json<CartView>> {
    let product = state.catalog().product(form.product_id).await?;
    let quantity = form.quantity;
    let view = blocking(&state, move |state| {
        let status = state.cart().add(&product, quantity)?;
        Ok::<_, CartError>(CartView::after(state, &status))
    })
    .await??;

    let product_id = form.product_id.to_string();
    add_breadcrumb(
        "cart",
        "Added to cart",
        Some(&[("product_id", product_id.as_str())]),
    );
    Ok(Json(view))
}

/// Set the quantity of a line. Zero or less removes it.
#[instrument(skip(state, form), fields(product_id = %product_id, quantity = form.quantity))]
pub async fn set_quantity(
    State(state): State<AppState>,
    Path(product_id): Path<ProductId>,
    Json(form): Json<UpdateQuantityForm>,
) -> Result<Json<CartView>> {
    let view = blocking(&state, move |state| {
        let status = state.cart().set_quantity(product_id, form.quantity)?;
        Ok::<_, CartError>(CartView::after(state, &status))
    })
    .await??;
    Ok(Json(view))
}

/// Remove a line from the cart.
#[instrument(skip(state), fields(product_id = %product_id))]
pub async fn remove(
    State(state): State<AppState>,
    Path(product_id): Path<ProductId>,
) -> Result<Json<CartView>> {
    let view = blocking(&state, move |state| {
        let status = state.cart().remove(product_id);
        CartView::after(state, &status)
    })
    .await?;
    Ok(Json(view))
}

/// Empty the cart.
pub async fn clear(State(state): State<AppState>) -> Result<Json<CartView>> {
    let view = blocking(&state, |state| {
        let status = state.cart().clear();
        CartView::after(state, &status)
    })
    .await?;
    Ok(Json(view))
}
