//! Wishlist commands.

use serde_json::json;
use shopfront_core::ProductId;
use shopfront_storefront::state::AppState;

use super::{CommandError, print_json};

pub fn show(state: &AppState) -> Result<(), CommandError> {
    print_json(&json!({ "ids": state.wishlist().all_ids() }))
}

pub fn toggle(state: &AppState, product_id: i64) -> Result<(), CommandError> {
    let product_id = ProductId::new(product_id);
    let toggled = state.wishlist().toggle(product_id);
    print_json(&json!({
        "product_id": product_id,
        "present": toggled.value,
        "saved": toggled.status.is_saved(),
    }))
}
