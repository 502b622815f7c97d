//! Shopfront storefront library.
//!
//! The client-side core of a storefront: cart, pricing, cached catalog,
//! checkout with local fallback, order ledger and wishlist, plus the JSON
//! HTTP adapter served by the `shopfront-storefront` binary.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod backend;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod error;
pub mod ledger;
pub mod notify;
pub mod persistence;
pub mod pricing;
pub mod routes;
pub mod state;
pub mod wishlist;

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use state::AppState;

/// Build the application router with state attached.
///
/// Sentry layers are added by the binary so tests can drive the router
/// without a Sentry hub.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(routes::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check the backend.
async fn health() -> &'static str {
    "ok"
}
