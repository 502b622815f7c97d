//! HTTP route handlers for the storefront JSON API.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                            - Health check
//!
//! # Catalog (cached)
//! GET    /api/catalog/categories            - Category listing
//! GET    /api/catalog/products              - Product listing with filters
//! GET    /api/catalog/products/{id}         - Product detail
//! GET    /api/catalog/payment-methods       - Enabled payment methods
//! POST   /api/catalog/refresh               - Drop every cached entry
//!
//! # Cart
//! GET    /api/cart                          - Cart with presented totals
//! DELETE /api/cart                          - Empty the cart
//! POST   /api/cart/lines                    - Add a product
//! PUT    /api/cart/lines/{product_id}       - Set a line quantity
//! DELETE /api/cart/lines/{product_id}       - Remove a line
//!
//! # Checkout
//! POST   /api/checkout                      - Place the cart as an order
//! GET    /api/orders                        - Local orders, most recent first
//!
//! # Wishlist
//! GET    /api/wishlist                      - Wishlisted product ids
//! POST   /api/wishlist/{product_id}/toggle  - Add or remove a product
//! ```

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod wishlist;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::error::Result;
use crate::state::AppState;

/// Run a store operation on the blocking pool.
///
/// Store mutations write their snapshot to disk while holding the store lock.
pub(crate) async fn blocking<T, F>(state: &AppState, op: F) -> Result<T>
where
    F: FnOnce(&AppState) -> T + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    Ok(tokio::task::spawn_blocking(move || op(&state)).await?)
}

/// Create the catalog routes router.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(catalog::categories))
        .route("/products", get(catalog::products))
        .route("/products/{id}", get(catalog::product))
        .route("/payment-methods", get(catalog::payment_methods))
        .route("/refresh", post(catalog::refresh))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).delete(cart::clear))
        .route("/lines", post(cart::add))
        .route(
            "/lines/{product_id}",
            put(cart::set_quantity).delete(cart::remove),
        )
}

/// Create the wishlist routes router.
pub fn wishlist_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(wishlist::show))
        .route("/{product_id}/toggle", post(wishlist::toggle))
}

/// Create all API routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/api/catalog", catalog_routes())
        .nest("/api/cart", cart_routes())
        .route("/api/checkout", post(checkout::place))
        .route("/api/orders", get(checkout::orders))
        .nest("/api/wishlist", wishlist_routes())
}
