//! Checkout and order history commands.

use clap::Args;
use shopfront_core::{Address, CustomerId};
use shopfront_storefront::checkout::CheckoutRequest;
use shopfront_storefront::state::AppState;

use super::{CommandError, print_json};

/// Delivery address flags.
#[derive(Debug, Args)]
pub struct AddressArgs {
    /// Full name
    #[arg(long)]
    pub name: String,

    #[arg(long)]
    pub phone: String,

    #[arg(long)]
    pub email: Option<String>,

    #[arg(long)]
    pub company: Option<String>,

    /// Street address
    #[arg(long)]
    pub line1: String,

    #[arg(long)]
    pub line2: Option<String>,

    #[arg(long)]
    pub city: String,

    #[arg(long)]
    pub state: String,

    #[arg(long)]
    pub postal_code: String,

    /// ISO 3166-1 alpha-2 country code
    #[arg(long)]
    pub country: Option<String>,
}

impl From<AddressArgs> for Address {
    fn from(args: AddressArgs) -> Self {
        Self {
            name: args.name,
            phone: args.phone,
            email: args.email,
            company: args.company,
            line1: args.line1,
            line2: args.line2,
            city: args.city,
            state: args.state,
            postal_code: args.postal_code,
            country: args.country,
        }
    }
}

/// Place the cart as an order and print the outcome.
pub async fn place(
    state: &AppState,
    address: AddressArgs,
    payment_method: String,
    payment_method_title: Option<String>,
    customer_id: Option<i64>,
) -> Result<(), CommandError> {
    let request = CheckoutRequest {
        address: address.into(),
        payment_method,
        payment_method_title,
        customer_id: customer_id.map(CustomerId::new),
    };

    let outcome = state.checkout().checkout(request).await?;
    if outcome.is_local() {
        tracing::warn!("Order recorded locally, it was not sent to the backend");
    }
    print_json(&outcome)
}

pub fn orders(state: &AppState) -> Result<(), CommandError> {
    print_json(&state.ledger().all())
}
