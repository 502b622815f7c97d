//! Wire types for the commerce REST API.
//!
//! Field names follow the backend's JSON. Prices arrive as decimal strings and
//! are parsed in `conversions`.

use serde::{Deserialize, Serialize};
use shopfront_core::{Money, OrderStatus, RemoteOrderId};

// =============================================================================
// Catalog
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct WireImage {
    pub src: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireCategoryRef {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireMeta {
    pub key: String,
    #[serde(default)]
    pub value: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireProduct {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub regular_price: String,
    #[serde(default)]
    pub stock_quantity: Option<i64>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub images: Vec<WireImage>,
    #[serde(default)]
    pub categories: Vec<WireCategoryRef>,
    #[serde(default)]
    pub meta_data: Vec<WireMeta>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireCategory {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub slug: String,
    /// 0 for top-level categories.
    #[serde(default)]
    pub parent: i64,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub image: Option<WireImage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WirePaymentGateway {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub enabled: bool,
}

// =============================================================================
// Orders and customers
// =============================================================================

/// Billing or shipping address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WireAddress {
    pub first_name: String,
    pub last_name: String,
    pub company: String,
    pub address_1: String,
    pub address_2: String,
    pub city: String,
    pub state: String,
    pub postcode: String,
    pub country: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WireLineItem {
    pub product_id: i64,
    pub quantity: u32,
}

/// Body of an order-creation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewRemoteOrder {
    pub payment_method: String,
    pub payment_method_title: String,
    pub set_paid: bool,
    pub billing: WireAddress,
    pub shipping: WireAddress,
    pub line_items: Vec<WireLineItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireOrder {
    pub id: i64,
    #[serde(default)]
    pub number: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub total: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct WireStatusUpdate<'a> {
    pub status: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireCustomer {
    pub id: i64,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub billing: Option<WireAddress>,
    #[serde(default)]
    pub shipping: Option<WireAddress>,
}

/// Body of a customer create/update request. Unset fields are omitted.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WireCustomerPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing: Option<WireAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping: Option<WireAddress>,
}

/// Error body returned with non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct WireApiError {
    #[serde(default)]
    pub code: String,
    pub message: String,
}

// =============================================================================
// Results
// =============================================================================

/// An order as acknowledged by the remote backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteOrder {
    pub id: RemoteOrderId,
    /// Customer-facing order number.
    pub number: String,
    pub status: OrderStatus,
    pub total: Money,
}
