//! JSON API round trips through the router with a mocked backend.

#![allow(clippy::unwrap_used)]

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use serde_json::{Value, json};
use shopfront_core::{Money, ProductId};
use shopfront_integration_tests::{API_ROOT, commerce_config, product_json, state};
use shopfront_storefront::state::AppState;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn call(
    state: &AppState,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = shopfront_storefront::app(state.clone())
        .oneshot(request)
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

async fn mount_product(server: &MockServer, id: i64, price: &str, regular_price: &str) {
    Mock::given(method("GET"))
        .and(path(format!("{API_ROOT}/products/{id}")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(product_json(id, price, regular_price)),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_browse_add_and_check_out_remotely() {
    let server = MockServer::start().await;
    mount_product(&server, 21, "450", "500").await;
    Mock::given(method("POST"))
        .and(path(format!("{API_ROOT}/orders")))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 9001,
            "number": "9001",
            "status": "pending",
            "total": "950.00"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let state = state(Some(commerce_config(&server)));

    let (status, product) = call(&state, Method::GET, "/api/catalog/products/21", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(product["id"], 21);

    let (status, cart) = call(
        &state,
        Method::POST,
        "/api/cart/lines",
        Some(json!({ "product_id": 21, "quantity": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["item_count"], 2);
    assert_eq!(cart["saved"], true);
    // 2 x 50 markdown
    let discount: Money = serde_json::from_value(cart["totals"]["discount"].clone()).unwrap();
    assert_eq!(discount, Money::from_units(100));

    let (status, outcome) = call(
        &state,
        Method::POST,
        "/api/checkout",
        Some(json!({
            "address": {
                "name": "Ravi Kumar",
                "phone": "9000000001",
                "line1": "7 Park Lane",
                "city": "Kochi",
                "state": "KL",
                "postal_code": "682001"
            },
            "payment_method": "cod"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(outcome["kind"], "remote");
    assert_eq!(outcome["order_number"], "9001");

    let (_, cart) = call(&state, Method::GET, "/api/cart", None).await;
    assert_eq!(cart["item_count"], 0);
    let (_, orders) = call(&state, Method::GET, "/api/orders", None).await;
    assert_eq!(orders, json!([]));
}

#[tokio::test]
async fn test_missing_product_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{API_ROOT}/products/404")))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "code": "woocommerce_rest_product_invalid_id",
            "message": "Invalid ID."
        })))
        .mount(&server)
        .await;

    let state = state(Some(commerce_config(&server)));

    let (status, _) = call(&state, Method::GET, "/api/catalog/products/404", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(
        &state,
        Method::POST,
        "/api/cart/lines",
        Some(json!({ "product_id": 404 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(state.cart().is_empty());
}

#[tokio::test]
async fn test_backend_failure_hides_details() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{API_ROOT}/payment_gateways")))
        .respond_with(ResponseTemplate::new(500).set_body_string("stack trace with secrets"))
        .mount(&server)
        .await;

    let state = state(Some(commerce_config(&server)));

    let (status, body) = call(&state, Method::GET, "/api/catalog/payment-methods", None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "External service error");
}

#[tokio::test]
async fn test_cart_lines_use_catalog_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{API_ROOT}/products/5")))
        .respond_with(ResponseTemplate::new(200).set_body_json(product_json(5, "10", "10")))
        .expect(1)
        .mount(&server)
        .await;

    let state = state(Some(commerce_config(&server)));

    for _ in 0..3 {
        let (status, _) = call(
            &state,
            Method::POST,
            "/api/cart/lines",
            Some(json!({ "product_id": 5 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    assert_eq!(state.cart().line(ProductId::new(5)).unwrap().quantity, 3);
}

#[tokio::test]
async fn test_unpriced_product_never_enters_cart() {
    let server = MockServer::start().await;
    mount_product(&server, 31, "", "").await;

    let state = state(Some(commerce_config(&server)));

    let (status, body) = call(
        &state,
        Method::POST,
        "/api/cart/lines",
        Some(json!({ "product_id": 31, "quantity": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "External service error");
    assert!(state.cart().is_empty());

    let (status, _) = call(&state, Method::GET, "/api/catalog/products/31", None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_listing_leaves_out_unpriced_products() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{API_ROOT}/products")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([product_json(1, "25", "30"), product_json(2, "", "")])),
        )
        .mount(&server)
        .await;

    let state = state(Some(commerce_config(&server)));

    let (status, body) = call(&state, Method::GET, "/api/catalog/products", None).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<i64> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![1]);
}
