//! Wishlist handlers.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;
use shopfront_core::ProductId;

use super::blocking;
use crate::error::Result;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct WishlistView {
    pub ids: Vec<ProductId>,
}

/// Result of a toggle.
#[derive(Debug, Serialize)]
pub struct ToggleView {
    pub product_id: ProductId,
    pub present: bool,
    pub saved: bool,
}

#[allow(clippy::unused_async)]
pub async fn show(State(state): State<AppState>) -> Json<WishlistView> {
    Json(WishlistView {
        ids: state.wishlist().all_ids(),
    })
}

/// Add the product if absent, remove it if present.
pub async fn toggle(
    State(state): State<AppState>,
    Path(product_id): Path<ProductId>,
) -> Result<Json<ToggleView>> {
    let toggled = blocking(&state, move |state| state.wishlist().toggle(product_id)).await?;
    Ok(Json(ToggleView {
        product_id,
        present: toggled.value,
        saved: toggled.status.is_saved(),
    }))
}
