//! Cart commands.

use shopfront_core::ProductId;
use shopfront_storefront::routes::cart::CartView;
use shopfront_storefront::state::AppState;

use super::{CommandError, print_json};

pub fn show(state: &AppState) -> Result<(), CommandError> {
    print_json(&CartView::current(state))
}

/// Add a product, priced from the catalog.
pub async fn add(state: &AppState, product_id: i64, quantity: u32) -> Result<(), CommandError> {
    let product = state.catalog().product(ProductId::new(product_id)).await?;
    let status = state.cart().add(&product, quantity)?;
    print_json(&CartView::after(state, &status))
}

pub fn set(state: &AppState, product_id: i64, quantity: i64) -> Result<(), CommandError> {
    let status = state
        .cart()
        .set_quantity(ProductId::new(product_id), quantity)?;
    print_json(&CartView::after(state, &status))
}

pub fn remove(state: &AppState, product_id: i64) -> Result<(), CommandError> {
    let status = state.cart().remove(ProductId::new(product_id));
    print_json(&CartView::after(state, &status))
}

pub fn clear(state: &AppState) -> Result<(), CommandError> {
    let status = state.cart().clear();
    print_json(&CartView::after(state, &status))
}
