//! Checkout against a mocked commerce backend.
//!
//! Covers the remote happy path and every fallback to the local ledger.

#![allow(clippy::unwrap_used)]

use serde_json::json;
use shopfront_core::{Money, OrderStatus, RemoteOrderId};
use shopfront_integration_tests::{API_ROOT, address, commerce_config, config, product, state};
use shopfront_storefront::checkout::{CheckoutOutcome, CheckoutRequest, ValidationError};
use shopfront_storefront::state::AppState;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn request() -> CheckoutRequest {
    CheckoutRequest {
        address: address(),
        payment_method: "cod".to_string(),
        payment_method_title: Some("Cash on delivery".to_string()),
        customer_id: None,
    }
}

#[tokio::test]
async fn test_remote_checkout_clears_cart_without_local_order() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{API_ROOT}/orders")))
        .and(body_partial_json(json!({
            "payment_method": "cod",
            "payment_method_title": "Cash on delivery",
            "set_paid": false,
            "billing": {"first_name": "Meera", "last_name": "Iyer", "email": "meera@example.com"},
            "shipping": {"first_name": "Meera", "postcode": "600001"},
            "line_items": [{"product_id": 1, "quantity": 2}]
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 4410,
            "number": "4410",
            "status": "processing",
            "total": "2500.00"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let state = state(Some(commerce_config(&server)));
    state.cart().add(&product(1, 1000), 2).unwrap();

    let outcome = state.checkout().checkout(request()).await.unwrap();

    assert_eq!(
        outcome,
        CheckoutOutcome::Remote {
            id: RemoteOrderId::new(4410),
            order_number: "4410".to_string(),
            status: OrderStatus::Processing,
            total: Money::from_units(2500),
        }
    );
    assert!(state.cart().is_empty());
    assert!(state.ledger().is_empty());
}

#[tokio::test]
async fn test_without_backend_every_checkout_is_local() {
    let state = state(None);
    state.cart().add(&product(1, 1000), 2).unwrap();

    let outcome = state.checkout().checkout(request()).await.unwrap();

    let CheckoutOutcome::Local { id, total } = outcome else {
        panic!("expected a local order, got {outcome:?}");
    };
    // 2 x 1000 with delivery charged below the 50 000 threshold
    assert_eq!(total, Money::from_units(2500));
    assert!(state.cart().is_empty());
    assert_eq!(state.ledger().get(&id).unwrap().total(), total);
}

#[tokio::test]
async fn test_rejected_remote_order_falls_back_to_ledger() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{API_ROOT}/orders")))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "code": "internal_error",
            "message": "database unavailable"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let state = state(Some(commerce_config(&server)));
    state.cart().add(&product(1, 1000), 2).unwrap();

    let outcome = state.checkout().checkout(request()).await.unwrap();

    assert!(outcome.is_local());
    assert_eq!(state.ledger().len(), 1);
    assert!(state.cart().is_empty());
    let order = &state.ledger().all()[0];
    assert_eq!(order.item_count(), 2);
    assert_eq!(order.payment_method(), "cod");
}

#[tokio::test]
async fn test_rate_limited_remote_falls_back_to_ledger() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{API_ROOT}/orders")))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "30"))
        .mount(&server)
        .await;

    let state = state(Some(commerce_config(&server)));
    state.cart().add(&product(2, 300), 1).unwrap();

    assert!(state.checkout().checkout(request()).await.unwrap().is_local());
    assert_eq!(state.ledger().len(), 1);
}

#[tokio::test]
async fn test_unknown_endpoint_falls_back_to_ledger() {
    // No mocks mounted: every request answers 404
    let server = MockServer::start().await;
    let state = state(Some(commerce_config(&server)));
    state.cart().add(&product(3, 50), 4).unwrap();

    assert!(state.checkout().checkout(request()).await.unwrap().is_local());
    assert!(state.cart().is_empty());
}

#[tokio::test]
async fn test_repeated_checkout_records_distinct_orders() {
    let state = state(None);

    state.cart().add(&product(1, 1000), 1).unwrap();
    let first = state.checkout().checkout(request()).await.unwrap();
    state.cart().add(&product(1, 1000), 1).unwrap();
    let second = state.checkout().checkout(request()).await.unwrap();

    assert_ne!(first, second);
    assert_eq!(state.ledger().len(), 2);
}

#[tokio::test]
async fn test_rejected_checkout_leaves_everything_untouched() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{API_ROOT}/orders")))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let state = state(Some(commerce_config(&server)));
    state.cart().add(&product(1, 1000), 1).unwrap();

    let mut incomplete = request();
    incomplete.address.postal_code = "  ".to_string();
    let err = state.checkout().checkout(incomplete).await.unwrap_err();

    assert!(matches!(err, ValidationError::IncompleteAddress { .. }));
    assert_eq!(state.cart().line_count(), 1);
    assert!(state.ledger().is_empty());
}

#[tokio::test]
async fn test_local_orders_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config(None);
    cfg.data_dir = dir.path().to_path_buf();

    let placed = {
        let state = AppState::new(cfg.clone()).unwrap();
        state.cart().add(&product(1, 1000), 2).unwrap();
        state.wishlist().toggle(product(9, 10).id);
        state.checkout().checkout(request()).await.unwrap()
    };

    let reopened = AppState::new(cfg).unwrap();
    let CheckoutOutcome::Local { id, .. } = placed else {
        panic!("expected a local order");
    };
    assert!(reopened.ledger().get(&id).is_some());
    assert!(reopened.cart().is_empty());
    assert_eq!(reopened.wishlist().all_ids(), vec![product(9, 10).id]);
    assert!(dir.path().join("orders.json").exists());
}
