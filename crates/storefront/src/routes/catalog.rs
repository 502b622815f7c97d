//! Catalog route handlers.
//!
//! Every read goes through the catalog cache; the query string is the cache
//! key, so identical listings within the TTL are served without a backend
//! round trip.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use shopfront_core::{Category, Page, PaymentMethod, Product, ProductId};
use tracing::instrument;

use crate::catalog::{CategoryQuery, ProductQuery};
use crate::error::Result;
use crate::state::AppState;

/// List categories.
#[instrument(skip(state))]
pub async fn categories(
    State(state): State<AppState>,
    Query(query): Query<CategoryQuery>,
) -> Result<Json<Page<Category>>> {
    Ok(Json(state.catalog().categories(&query).await?))
}

/// List products matching the query filters.
#[instrument(skip(state))]
pub async fn products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<Page<Product>>> {
    Ok(Json(state.catalog().products(&query).await?))
}

/// Display a single product.
#[instrument(skip(state), fields(product_id = %id))]
pub async fn product(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>> {
    Ok(Json(state.catalog().product(id).await?))
}

#[instrument(skip(state))]
pub async fn payment_methods(State(state): State<AppState>) -> Result<Json<Vec<PaymentMethod>>> {
    Ok(Json(state.catalog().payment_methods().await?))
}

/// Drop every cached catalog entry.
#[allow(clippy::unused_async)]
pub async fn refresh(State(state): State<AppState>) -> StatusCode {
    state.catalog().refresh();
    StatusCode::NO_CONTENT
}
