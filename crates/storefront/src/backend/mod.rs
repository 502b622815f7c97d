//! Remote commerce backend client.
//!
//! A REST client for a WooCommerce-style API. Every request carries the
//! consumer key/secret as HTTP basic auth and is bounded by the configured
//! connect and request timeouts. The client does no caching of its own; the
//! catalog service caches in front of it.

mod conversions;
pub mod types;

use std::sync::Arc;

use reqwest::header::{ACCEPT, HeaderMap, RETRY_AFTER};
use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use shopfront_core::{
    Category, Customer, CustomerDraft, CustomerId, OrderStatus, Page, PaymentMethod, Product,
    ProductId, RemoteOrderId,
};
use thiserror::Error;
use tracing::{debug, error, instrument};
use url::Url;

use crate::catalog::{CatalogSource, CategoryQuery, ProductQuery};
use crate::checkout::OrderPlacer;
use crate::config::CommerceConfig;

pub use conversions::new_remote_order;
pub use types::{NewRemoteOrder, RemoteOrder};

use conversions::{
    convert_category, convert_customer, convert_order, convert_payment_gateways, convert_product,
    customer_payload,
};
use types::{
    WireApiError, WireCategory, WireCustomer, WireOrder, WirePaymentGateway, WireProduct,
    WireStatusUpdate,
};

const TOTAL_HEADER: &str = "X-WP-Total";
const TOTAL_PAGES_HEADER: &str = "X-WP-TotalPages";
/// How much of an error body is kept in messages and logs.
const ERROR_BODY_LIMIT: usize = 200;

/// Errors that can occur when talking to the commerce backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// No backend URL and credentials are configured.
    #[error("Remote commerce backend is not configured")]
    NotConfigured,

    /// HTTP request failed (connect, timeout, TLS, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A request URL could not be built.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A product came back without a usable price.
    #[error("Product {0} has no usable price")]
    Unpriced(ProductId),
}

/// Body and pagination headers of a successful response.
struct Fetched {
    body: String,
    total: Option<u64>,
    total_pages: Option<u32>,
}

// =============================================================================
// CommerceClient
// =============================================================================

/// Client for the commerce REST API.
#[derive(Clone)]
pub struct CommerceClient {
    inner: Arc<CommerceClientInner>,
}

struct CommerceClientInner {
    client: reqwest::Client,
    base_url: Url,
    consumer_key: String,
    consumer_secret: SecretString,
}

impl std::fmt::Debug for CommerceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommerceClient")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl CommerceClient {
    /// Create a client from backend configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &CommerceConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .user_agent(concat!("shopfront/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(CommerceClientInner {
                client,
                base_url: config.base_url.clone(),
                consumer_key: config.consumer_key.clone(),
                consumer_secret: config.consumer_secret.clone(),
            }),
        })
    }

    fn endpoint(&self, path: &str, query: &[(&str, String)]) -> Result<Url, BackendError> {
        let mut url = self.inner.base_url.join(path)?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(url)
    }

    /// Send a request and return the body of a 2xx response.
    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<&(impl Serialize + Sync)>,
    ) -> Result<Fetched, BackendError> {
        debug!(%method, path = url.path(), "Commerce API request");

        let mut request = self
            .inner
            .client
            .request(method, url)
            .basic_auth(
                &self.inner.consumer_key,
                Some(self.inner.consumer_secret.expose_secret()),
            )
            .header(ACCEPT, "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = header_value(response.headers(), RETRY_AFTER.as_str()).unwrap_or(1);
            return Err(BackendError::RateLimited(retry_after));
        }

        let total = header_value(response.headers(), TOTAL_HEADER);
        let total_pages = header_value(response.headers(), TOTAL_PAGES_HEADER);
        let body = response.text().await?;

        if status == StatusCode::NOT_FOUND {
            return Err(BackendError::NotFound(error_message(&body)));
        }
        if !status.is_success() {
            error!(
                status = %status,
                body = %truncate(&body),
                "Commerce API returned non-success status"
            );
            return Err(BackendError::Api {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        Ok(Fetched {
            body,
            total,
            total_pages,
        })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<(T, Fetched), BackendError> {
        let fetched = self
            .send(Method::GET, self.endpoint(path, query)?, None::<&()>)
            .await?;
        Ok((decode(&fetched.body)?, fetched))
    }

    async fn write<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &(impl Serialize + Sync),
    ) -> Result<T, BackendError> {
        let fetched = self
            .send(method, self.endpoint(path, &[])?, Some(body))
            .await?;
        decode(&fetched.body)
    }

    // =========================================================================
    // Catalog Methods
    // =========================================================================

    /// List product categories.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_categories(
        &self,
        query: &CategoryQuery,
    ) -> Result<Page<Category>, BackendError> {
        let mut params = vec![
            ("page", query.page().to_string()),
            ("per_page", query.per_page().to_string()),
        ];
        if let Some(parent) = query.parent {
            params.push(("parent", parent.to_string()));
        }
        if let Some(hide_empty) = query.hide_empty {
            params.push(("hide_empty", hide_empty.to_string()));
        }

        let (categories, fetched): (Vec<WireCategory>, _) =
            self.get("products/categories", &params).await?;
        Ok(page(
            categories.into_iter().map(convert_category).collect(),
            query.page(),
            query.per_page(),
            &fetched,
        ))
    }

    /// List published products matching `query`.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_products(&self, query: &ProductQuery) -> Result<Page<Product>, BackendError> {
        let params = product_params(query);
        let (products, fetched): (Vec<WireProduct>, _) = self.get("products", &params).await?;
        // Unpriced products are left out of listings; `convert_product` logs them.
        Ok(page(
            products
                .into_iter()
                .filter_map(|p| convert_product(p).ok())
                .collect(),
            query.page(),
            query.per_page(),
            &fetched,
        ))
    }

    /// Get a product by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the product is not found, has no usable price, or
    /// the API request fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get_product(&self, id: ProductId) -> Result<Product, BackendError> {
        let (product, _): (WireProduct, _) = self.get(&format!("products/{id}"), &[]).await?;
        convert_product(product)
    }

    /// List enabled payment methods.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_payment_methods(&self) -> Result<Vec<PaymentMethod>, BackendError> {
        let (gateways, _): (Vec<WirePaymentGateway>, _) =
            self.get("payment_gateways", &[]).await?;
        Ok(convert_payment_gateways(gateways))
    }

    // =========================================================================
    // Order Methods
    // =========================================================================

    /// Create an order.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the order or the request fails.
    #[instrument(skip(self, order), fields(lines = order.line_items.len()))]
    pub async fn create_order(&self, order: &NewRemoteOrder) -> Result<RemoteOrder, BackendError> {
        let created: WireOrder = self.write(Method::POST, "orders", order).await?;
        Ok(convert_order(created))
    }

    /// Get an order by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the order is not found or the API request fails.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn get_order(&self, id: RemoteOrderId) -> Result<RemoteOrder, BackendError> {
        let (order, _): (WireOrder, _) = self.get(&format!("orders/{id}"), &[]).await?;
        Ok(convert_order(order))
    }

    /// Set an order's status.
    ///
    /// # Errors
    ///
    /// Returns an error if the order is not found or the API request fails.
    #[instrument(skip(self), fields(order_id = %id, status = %status))]
    pub async fn update_order_status(
        &self,
        id: RemoteOrderId,
        status: OrderStatus,
    ) -> Result<RemoteOrder, BackendError> {
        let body = WireStatusUpdate {
            status: status.as_str(),
        };
        let order: WireOrder = self
            .write(Method::PUT, &format!("orders/{id}"), &body)
            .await?;
        Ok(convert_order(order))
    }

    // =========================================================================
    // Customer Methods
    // =========================================================================

    /// Create a customer.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the customer or the request fails.
    #[instrument(skip(self, draft))]
    pub async fn create_customer(&self, draft: &CustomerDraft) -> Result<Customer, BackendError> {
        let customer: WireCustomer = self
            .write(Method::POST, "customers", &customer_payload(draft))
            .await?;
        Ok(convert_customer(customer))
    }

    /// Get a customer by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the customer is not found or the API request fails.
    #[instrument(skip(self), fields(customer_id = %id))]
    pub async fn get_customer(&self, id: CustomerId) -> Result<Customer, BackendError> {
        let (customer, _): (WireCustomer, _) = self.get(&format!("customers/{id}"), &[]).await?;
        Ok(convert_customer(customer))
    }

    /// Update the fields of `draft` that are set.
    ///
    /// # Errors
    ///
    /// Returns an error if the customer is not found or the API request fails.
    #[instrument(skip(self, draft), fields(customer_id = %id))]
    pub async fn update_customer(
        &self,
        id: CustomerId,
        draft: &CustomerDraft,
    ) -> Result<Customer, BackendError> {
        let customer: WireCustomer = self
            .write(Method::PUT, &format!("customers/{id}"), &customer_payload(draft))
            .await?;
        Ok(convert_customer(customer))
    }
}

impl CatalogSource for CommerceClient {
    async fn list_categories(&self, query: &CategoryQuery) -> Result<Page<Category>, BackendError> {
        Self::list_categories(self, query).await
    }

    async fn list_products(&self, query: &ProductQuery) -> Result<Page<Product>, BackendError> {
        Self::list_products(self, query).await
    }

    async fn get_product(&self, id: ProductId) -> Result<Product, BackendError> {
        Self::get_product(self, id).await
    }

    async fn list_payment_methods(&self) -> Result<Vec<PaymentMethod>, BackendError> {
        Self::list_payment_methods(self).await
    }
}

impl OrderPlacer for CommerceClient {
    async fn create_order(&self, order: &NewRemoteOrder) -> Result<RemoteOrder, BackendError> {
        Self::create_order(self, order).await
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn product_params(query: &ProductQuery) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("status", "publish".to_string()),
        ("page", query.page().to_string()),
        ("per_page", query.per_page().to_string()),
    ];
    if let Some(category) = query.category {
        params.push(("category", category.to_string()));
    }
    if let Some(search) = query.search_term() {
        params.push(("search", search.to_string()));
    }
    if let Some(featured) = query.featured {
        params.push(("featured", featured.to_string()));
    }
    if let Some(min) = query.min_price {
        params.push(("min_price", min.to_string()));
    }
    if let Some(max) = query.max_price {
        params.push(("max_price", max.to_string()));
    }
    if let (Some(attribute), Some(term)) = (&query.attribute, &query.attribute_term) {
        params.push(("attribute", attribute.clone()));
        params.push(("attribute_term", term.clone()));
    }
    if let Some(on_sale) = query.on_sale {
        params.push(("on_sale", on_sale.to_string()));
    }
    if let Some(order_by) = query.order_by {
        params.push(("orderby", order_by.as_str().to_string()));
    }
    if let Some(order) = query.order {
        params.push(("order", order.as_str().to_string()));
    }
    params
}

fn page<T>(items: Vec<T>, page: u32, per_page: u32, fetched: &Fetched) -> Page<T> {
    Page {
        items,
        page,
        per_page,
        total: fetched.total,
        total_pages: fetched.total_pages,
    }
}

fn header_value<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse().ok())
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, BackendError> {
    serde_json::from_str(body).map_err(|e| {
        error!(
            error = %e,
            body = %truncate(body),
            "Failed to parse commerce API response"
        );
        BackendError::Parse(e)
    })
}

/// The backend's error message if the body has one, else the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<WireApiError>(body).map_or_else(
        |_| truncate(body),
        |e| {
            if e.code.is_empty() {
                e.message
            } else {
                format!("{} ({})", e.message, e.code)
            }
        },
    )
}

fn truncate(body: &str) -> String {
    body.chars().take(ERROR_BODY_LIMIT).collect()
}
