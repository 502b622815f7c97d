//! Checkout with remote placement and local fallback.
//!
//! One attempt walks a small state machine:
//!
//! ```text
//! Init -> Validating -> RemotePlacing -> Succeeded
//!                    |        |
//!                    |        v (any remote error)
//!                    +-> LocalPlacing -> Succeeded
//!                    |
//!                    +-> Failed (validation)
//! ```
//!
//! Only validation can fail an attempt. Every remote error, whatever its
//! kind, falls back to recording the order in the local ledger, with no
//! retry. The cart is cleared on either success path. Submissions are not
//! deduplicated.

use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use shopfront_core::{
    Address, AddressField, CartLine, CustomerId, Money, OrderId, OrderStatus, RemoteOrderId,
};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::backend::{BackendError, NewRemoteOrder, RemoteOrder, new_remote_order};
use crate::cart::CartStore;
use crate::ledger::OrderLedger;
use crate::pricing::PricingEngine;

/// Places orders on the remote backend.
pub trait OrderPlacer: Send + Sync {
    fn create_order(
        &self,
        order: &NewRemoteOrder,
    ) -> impl Future<Output = Result<RemoteOrder, BackendError>> + Send;
}

impl<P: OrderPlacer> OrderPlacer for Arc<P> {
    fn create_order(
        &self,
        order: &NewRemoteOrder,
    ) -> impl Future<Output = Result<RemoteOrder, BackendError>> + Send {
        (**self).create_order(order)
    }
}

// =============================================================================
// State machine
// =============================================================================

/// Stage of one checkout attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStage {
    Init,
    Validating,
    RemotePlacing,
    LocalPlacing,
    Succeeded,
    Failed,
}

/// What happened in the current stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageEvent {
    Start,
    ValidationPassed { remote_configured: bool },
    ValidationFailed,
    RemoteAccepted,
    RemoteRejected,
    LocalRecorded,
}

impl CheckoutStage {
    /// The stage after `event`.
    ///
    /// Terminal stages absorb every event. An event that does not belong to
    /// the current stage fails the attempt.
    #[must_use]
    pub const fn advance(self, event: StageEvent) -> Self {
        match (self, event) {
            (Self::Succeeded, _) => Self::Succeeded,
            (Self::Init, StageEvent::Start) => Self::Validating,
            (
                Self::Validating,
                StageEvent::ValidationPassed {
                    remote_configured: true,
                },
            ) => Self::RemotePlacing,
            (
                Self::Validating,
                StageEvent::ValidationPassed {
                    remote_configured: false,
                },
            )
            | (Self::RemotePlacing, StageEvent::RemoteRejected) => Self::LocalPlacing,
            (Self::RemotePlacing, StageEvent::RemoteAccepted)
            | (Self::LocalPlacing, StageEvent::LocalRecorded) => Self::Succeeded,
            _ => Self::Failed,
        }
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// Tracks the stage of one attempt and logs each transition.
#[derive(Debug)]
struct Attempt {
    stage: CheckoutStage,
}

impl Attempt {
    const fn new() -> Self {
        Self {
            stage: CheckoutStage::Init,
        }
    }

    fn step(&mut self, event: StageEvent) -> CheckoutStage {
        let next = self.stage.advance(event);
        debug!(from = ?self.stage, to = ?next, ?event, "Checkout stage");
        self.stage = next;
        next
    }
}

// =============================================================================
// Requests and outcomes
// =============================================================================

/// Checkout preconditions that were not met. Nothing is mutated.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("cart is empty")]
    EmptyCart,

    #[error("order subtotal {subtotal} is below the minimum of {minimum}")]
    BelowMinimum { subtotal: Money, minimum: Money },

    #[error("address is missing required fields: {}", join_fields(.fields))]
    IncompleteAddress { fields: Vec<AddressField> },
}

fn join_fields(fields: &[AddressField]) -> String {
    fields
        .iter()
        .map(AddressField::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Input to a checkout attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub address: Address,
    /// Opaque payment method id, passed through.
    pub payment_method: String,
    /// Display title sent to the backend. Defaults to the id.
    #[serde(default)]
    pub payment_method_title: Option<String>,
    #[serde(default)]
    pub customer_id: Option<CustomerId>,
}

/// How a successful checkout was recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CheckoutOutcome {
    /// Accepted by the remote backend.
    Remote {
        id: RemoteOrderId,
        order_number: String,
        status: OrderStatus,
        total: Money,
    },
    /// Recorded in the local ledger.
    Local { id: OrderId, total: Money },
}

impl CheckoutOutcome {
    #[must_use]
    pub const fn is_local(&self) -> bool {
        matches!(self, Self::Local { .. })
    }
}

// =============================================================================
// CheckoutService
// =============================================================================

/// Runs checkout attempts against the cart.
pub struct CheckoutService<P> {
    cart: Arc<CartStore>,
    ledger: Arc<OrderLedger>,
    pricing: PricingEngine,
    minimum_order_amount: Money,
    remote: Option<P>,
}

impl<P: OrderPlacer> CheckoutService<P> {
    /// `remote` is `None` when no backend is configured; every checkout is
    /// then recorded locally.
    #[must_use]
    pub const fn new(
        cart: Arc<CartStore>,
        ledger: Arc<OrderLedger>,
        pricing: PricingEngine,
        minimum_order_amount: Money,
        remote: Option<P>,
    ) -> Self {
        Self {
            cart,
            ledger,
            pricing,
            minimum_order_amount,
            remote,
        }
    }

    #[must_use]
    pub const fn is_remote_configured(&self) -> bool {
        self.remote.is_some()
    }

    /// Check the preconditions for placing `lines` to `address`.
    ///
    /// # Errors
    ///
    /// Returns the first unmet precondition: empty cart, subtotal below the
    /// minimum, then missing address fields.
    pub fn validate(&self, lines: &[CartLine], address: &Address) -> Result<(), ValidationError> {
        if lines.is_empty() {
            return Err(ValidationError::EmptyCart);
        }

        let subtotal = self.pricing.subtotal(lines);
        if subtotal < self.minimum_order_amount {
            return Err(ValidationError::BelowMinimum {
                subtotal,
                minimum: self.minimum_order_amount,
            });
        }

        let fields = address.missing_fields();
        if !fields.is_empty() {
            return Err(ValidationError::IncompleteAddress { fields });
        }
        Ok(())
    }

    /// Place the current cart as an order.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if the cart or address does not satisfy
    /// the checkout preconditions. Remote failures are not errors; they fall
    /// back to a local order.
    #[instrument(skip(self, request), fields(payment_method = %request.payment_method))]
    pub async fn checkout(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutOutcome, ValidationError> {
        let mut attempt = Attempt::new();
        attempt.step(StageEvent::Start);

        let lines = self.cart.snapshot();
        if let Err(e) = self.validate(&lines, &request.address) {
            attempt.step(StageEvent::ValidationFailed);
            info!(error = %e, "Checkout rejected");
            return Err(e);
        }

        let stage = attempt.step(StageEvent::ValidationPassed {
            remote_configured: self.remote.is_some(),
        });

        if stage == CheckoutStage::RemotePlacing
            && let Some(remote) = &self.remote
        {
            let title = request
                .payment_method_title
                .as_deref()
                .unwrap_or(&request.payment_method);
            let payload = new_remote_order(
                &lines,
                &request.address,
                &request.payment_method,
                title,
                request.customer_id,
            );

            match remote.create_order(&payload).await {
                Ok(order) => {
                    attempt.step(StageEvent::RemoteAccepted);
                    self.cart.remove_placed(&lines);
                    info!(order_id = %order.id, number = %order.number, "Remote order placed");
                    return Ok(CheckoutOutcome::Remote {
                        id: order.id,
                        order_number: order.number,
                        status: order.status,
                        total: order.total,
                    });
                }
                Err(e) => {
                    warn!(error = %e, "Remote order placement failed, recording order locally");
                    attempt.step(StageEvent::RemoteRejected);
                }
            }
        }

        let order = self
            .ledger
            .place(
                lines,
                request.address,
                request.payment_method,
                request.customer_id,
            )
            .value;
        attempt.step(StageEvent::LocalRecorded);
        self.cart.remove_placed(order.lines());

        info!(order_id = %order.id(), total = %order.total(), "Local order placed");
        Ok(CheckoutOutcome::Local {
            id: order.id().clone(),
            total: order.total(),
        })
    }
}

impl<P> std::fmt::Debug for CheckoutService<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckoutService")
            .field("minimum_order_amount", &self.minimum_order_amount)
            .field("remote_configured", &self.remote.is_some())
            .finish_non_exhaustive()
    }
}
