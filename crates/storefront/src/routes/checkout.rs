//! Checkout and order history handlers.

use axum::{Json, extract::State, http::StatusCode};
use shopfront_core::Order;
use tracing::instrument;

use crate::checkout::{CheckoutOutcome, CheckoutRequest};
use crate::error::{Result, add_breadcrumb};
use crate::state::AppState;

/// Place the current cart as an order.
///
/// Responds `201 Created` with the outcome. Validation failures map to
/// `422`; remote failures never surface here because they fall back to the
/// local ledger.
#[instrument(skip(state, request))]
pub async fn place(
    State(state): State<AppState>,
    Json(request): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<CheckoutOutcome>)> {
    add_breadcrumb(
        "checkout",
        "Checkout started",
        Some(&[("payment_method", request.payment_method.as_str())]),
    );

    let outcome = state.checkout().checkout(request).await?;

    let kind = if outcome.is_local() { "local" } else { "remote" };
    add_breadcrumb("checkout", "Order placed", Some(&[("kind", kind)]));

    Ok((StatusCode::CREATED, Json(outcome)))
}

/// Local orders, most recent first.
#[allow(clippy::unused_async)]
pub async fn orders(State(state): State<AppState>) -> Json<Vec<Order>> {
    Json(state.ledger().all())
}
