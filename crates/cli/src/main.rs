//! Shopfront CLI - storefront client for the terminal.
//!
//! Shares the cart, order ledger and wishlist files with the storefront
//! server (`SHOPFRONT_DATA_DIR`), so a cart edited here is the cart the
//! server sees.
//!
//! # Usage
//!
//! ```bash
//! # Browse the catalog
//! shopfront catalog categories
//! shopfront catalog products --category 12 --search mug
//! shopfront catalog product 131
//!
//! # Edit the cart
//! shopfront cart add 131 -q 2
//! shopfront cart set 131 5
//! shopfront cart show
//!
//! # Place the cart as an order
//! shopfront checkout --payment-method cod --name "Asha Rao" --phone 9800000000 \
//!     --line1 "12 Lake Road" --city Pune --state MH --postal-code 411001
//! ```
//!
//! Output is JSON on stdout; diagnostics go to stderr.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use shopfront_storefront::config::StorefrontConfig;
use shopfront_storefront::state::AppState;

mod commands;

use commands::CommandError;
use commands::checkout::AddressArgs;

#[derive(Parser)]
#[command(name = "shopfront")]
#[command(author, version, about = "Shopfront storefront client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Browse the remote catalog
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },
    /// Show or edit the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Place the current cart as an order
    Checkout {
        /// Payment method id, as listed by `catalog payment-methods`
        #[arg(short, long)]
        payment_method: String,

        /// Payment method title sent to the backend (defaults to the id)
        #[arg(long)]
        payment_method_title: Option<String>,

        /// Remote customer id
        #[arg(long)]
        customer_id: Option<i64>,

        #[command(flatten)]
        address: AddressArgs,
    },
    /// List local orders, most recent first
    Orders,
    /// Show or edit the wishlist
    Wishlist {
        #[command(subcommand)]
        action: WishlistAction,
    },
}

#[derive(Subcommand)]
enum CatalogAction {
    /// List product categories
    Categories {
        #[arg(long)]
        page: Option<u32>,

        #[arg(long)]
        per_page: Option<u32>,

        /// Only children of this category (0 for top level)
        #[arg(long)]
        parent: Option<i64>,
    },
    /// List products
    Products {
        #[arg(short, long)]
        category: Option<i64>,

        #[arg(short, long)]
        search: Option<String>,

        #[arg(long)]
        page: Option<u32>,

        #[arg(long)]
        per_page: Option<u32>,

        /// Only featured products
        #[arg(long)]
        featured: bool,

        /// Only products on sale
        #[arg(long)]
        on_sale: bool,

        #[arg(long)]
        min_price: Option<Decimal>,

        #[arg(long)]
        max_price: Option<Decimal>,
    },
    /// Show one product
    Product { id: i64 },
    /// List enabled payment methods
    PaymentMethods,
}

#[derive(Subcommand)]
enum CartAction {
    /// Show lines and totals
    Show,
    /// Add a product (looked up in the catalog)
    Add {
        product_id: i64,

        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Set a line quantity (zero or less removes the line)
    Set {
        product_id: i64,

        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Remove a line
    Remove { product_id: i64 },
    /// Empty the cart
    Clear,
}

#[derive(Subcommand)]
enum WishlistAction {
    /// List wishlisted product ids
    Show,
    /// Add a product if absent, remove it if present
    Toggle { product_id: i64 },
}

#[tokio::main]
async fn main() {
    // Diagnostics on stderr so stdout stays machine-readable
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "shopfront_storefront=warn".into());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CommandError> {
    let config = StorefrontConfig::from_env()?;
    let state = AppState::new(config)?;

    match cli.command {
        Commands::Catalog { action } => match action {
            CatalogAction::Categories {
                page,
                per_page,
                parent,
            } => commands::catalog::categories(&state, page, per_page, parent).await?,
            CatalogAction::Products {
                category,
                search,
                page,
                per_page,
                featured,
                on_sale,
                min_price,
                max_price,
            } => {
                let filters = commands::catalog::ProductFilters {
                    category,
                    search,
                    page,
                    per_page,
                    featured,
                    on_sale,
                    min_price,
                    max_price,
                };
                commands::catalog::products(&state, filters).await?;
            }
            CatalogAction::Product { id } => commands::catalog::product(&state, id).await?,
            CatalogAction::PaymentMethods => commands::catalog::payment_methods(&state).await?,
        },
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(&state)?,
            CartAction::Add {
                product_id,
                quantity,
            } => commands::cart::add(&state, product_id, quantity).await?,
            CartAction::Set {
                product_id,
                quantity,
            } => commands::cart::set(&state, product_id, quantity)?,
            CartAction::Remove { product_id } => commands::cart::remove(&state, product_id)?,
            CartAction::Clear => commands::cart::clear(&state)?,
        },
        Commands::Checkout {
            payment_method,
            payment_method_title,
            customer_id,
            address,
        } => {
            commands::checkout::place(
                &state,
                address,
                payment_method,
                payment_method_title,
                customer_id,
            )
            .await?;
        }
        Commands::Orders => commands::checkout::orders(&state)?,
        Commands::Wishlist { action } => match action {
            WishlistAction::Show => commands::wishlist::show(&state)?,
            WishlistAction::Toggle { product_id } => {
                commands::wishlist::toggle(&state, product_id)?;
            }
        },
    }
    Ok(())
}
