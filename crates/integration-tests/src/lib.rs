//! Integration tests for Shopfront.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p shopfront-integration-tests
//! ```
//!
//! No external services are needed: the commerce backend is replaced by a
//! `wiremock` server and the stores live in memory or in a temporary
//! directory.
//!
//! # Test Categories
//!
//! - `checkout_scenarios` - checkout against a mocked backend, with and
//!   without a working remote
//! - `catalog_caching` - catalog reads through the real HTTP client
//! - `api` - JSON API round trips through the router

use secrecy::SecretString;
use serde_json::{Value, json};
use shopfront_core::{Address, Money, Product, ProductId};
use shopfront_storefront::config::{CommerceConfig, StorefrontConfig};
use shopfront_storefront::pricing::PricingConfig;
use shopfront_storefront::state::AppState;
use wiremock::MockServer;

/// REST root mounted on the mock server.
pub const API_ROOT: &str = "/wp-json/wc/v3";

/// Backend config pointing at `server`.
///
/// # Panics
///
/// Panics if the mock server URI is not a valid base URL.
#[must_use]
pub fn commerce_config(server: &MockServer) -> CommerceConfig {
    CommerceConfig::new(
        &format!("{}{API_ROOT}", server.uri()),
        "ck_integration",
        SecretString::from("cs_integration"),
    )
    .unwrap_or_else(|e| panic!("mock server URI rejected: {e}"))
}

/// Pricing used by the scenarios: free delivery from 50 000, otherwise 500.
#[must_use]
pub fn scenario_pricing() -> PricingConfig {
    PricingConfig {
        free_delivery_threshold: Money::from_units(50_000),
        delivery_fee: Money::from_units(500),
        ..PricingConfig::default()
    }
}

/// Storefront config with the scenario pricing and an optional backend.
#[must_use]
pub fn config(commerce: Option<CommerceConfig>) -> StorefrontConfig {
    StorefrontConfig {
        commerce,
        pricing: scenario_pricing(),
        ..StorefrontConfig::default()
    }
}

/// In-memory application state.
///
/// # Panics
///
/// Panics if the commerce client cannot be built.
#[must_use]
pub fn state(commerce: Option<CommerceConfig>) -> AppState {
    AppState::in_memory(config(commerce))
        .unwrap_or_else(|e| panic!("failed to build state: {e}"))
}

/// A product at `price`, not marked down.
#[must_use]
pub fn product(id: i64, price: i64) -> Product {
    Product {
        id: ProductId::new(id),
        name: format!("Product {id}"),
        unit_price: Money::from_units(price),
        compare_unit_price: Money::from_units(price),
        transfer_price: None,
        stock_quantity: Some(10),
        featured: false,
        image_url: None,
        category_ids: Vec::new(),
    }
}

/// A complete delivery address.
#[must_use]
pub fn address() -> Address {
    Address {
        name: "Meera Iyer".to_string(),
        phone: "9811122233".to_string(),
        email: Some("meera@example.com".to_string()),
        line1: "4 Church Street".to_string(),
        city: "Chennai".to_string(),
        state: "TN".to_string(),
        postal_code: "600001".to_string(),
        country: Some("IN".to_string()),
        ..Address::default()
    }
}

/// Wire representation of a product as the backend returns it.
#[must_use]
pub fn product_json(id: i64, price: &str, regular_price: &str) -> Value {
    json!({
        "id": id,
        "name": format!("Product {id}"),
        "price": price,
        "regular_price": regular_price,
        "stock_quantity": 5,
        "featured": false,
        "images": [{"src": format!("https://cdn.example.com/{id}.jpg")}],
        "categories": [{"id": 3}],
        "meta_data": [{"key": "transfer_price", "value": "40"}]
    })
}
