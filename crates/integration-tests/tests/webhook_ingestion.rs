//! Integration tests for signed webhook ingestion.
//!
//! Requests go through the full router (middleware, CORS, signature check,
//! dispatch) over an in-memory record store.

#![allow(clippy::unwrap_used)]

use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use rust_decimal::Decimal;
use serde_json::json;
use shopify_insights_core::{ShopifyCustomerId, ShopifyOrderId, StoreId};
use shopify_insights_integration_tests::{
    TEST_SECRET, TestContext, signed_request, webhook_request,
};
use shopify_insights_webhooks::config::StorageFailurePolicy;
use shopify_insights_webhooks::signature::{WebhookVerifier, sign};
use shopify_insights_webhooks::store::{MemoryRecordStore, RecordStore, TableCounts};

const ORDER_CREATE: &str = r#"{"id":123,"total_price":"50.00","customer":{"id":9}}"#;
const ORDER_UPDATE: &str = r#"{"id":123,"total_price":"75.00","customer":{"id":9}}"#;

async fn total_spent(store: &MemoryRecordStore, customer: &str) -> Decimal {
    store
        .find_customer(&StoreId::default(), &ShopifyCustomerId::new(customer))
        .await
        .unwrap()
        .unwrap()
        .total_spent
}

// ============================================================================
// Authentication
// ============================================================================

#[tokio::test]
async fn test_missing_signature_is_401_without_mutation() {
    let ctx = TestContext::new();
    let before = ctx.store.counts().await;

    let (status, body) = ctx
        .send(webhook_request(
            "/webhook/shopify",
            Some("orders/create"),
            None,
            ORDER_CREATE,
        ))
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({"error": "Invalid HMAC"}));
    assert_eq!(ctx.store.counts().await, before);
}

#[tokio::test]
async fn test_signature_over_different_bytes_is_rejected() {
    let ctx = TestContext::new();
    // Same JSON value, different byte layout.
    let reformatted = r#"{ "id": 123, "total_price": "50.00", "customer": { "id": 9 } }"#;
    let signature = sign(TEST_SECRET, ORDER_CREATE.as_bytes());

    let (status, _) = ctx
        .send(webhook_request(
            "/webhook/shopify",
            Some("orders/create"),
            Some(&signature),
            reformatted,
        ))
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(ctx.store.counts().await, TableCounts::default());
}

#[tokio::test]
async fn test_unconfigured_secret_rejects_everything() {
    let ctx = TestContext::with(|builder| builder.verifier(WebhookVerifier::new(None)));

    let (status, body) = ctx.post_signed("orders/create", ORDER_CREATE).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({"error": "Invalid HMAC"}));
    assert_eq!(ctx.store.counts().await, TableCounts::default());
}

#[tokio::test]
async fn test_unknown_topic_still_requires_signature() {
    let ctx = TestContext::new();
    let (status, _) = ctx
        .send(webhook_request(
            "/webhook/shopify",
            Some("shop/update"),
            None,
            "{}",
        ))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ============================================================================
// Routing
// ============================================================================

#[tokio::test]
async fn test_unknown_topic_is_acknowledged_without_mutation() {
    let ctx = TestContext::new();

    let (status, body) = ctx.post_signed("app/uninstalled", r#"{"id":1}"#).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"success": true, "event": "app/uninstalled", "message": "Event not handled"})
    );
    assert_eq!(ctx.store.counts().await, TableCounts::default());
}

#[tokio::test]
async fn test_missing_topic_header_is_ignored() {
    let ctx = TestContext::new();
    let (status, body) = ctx
        .send(signed_request("/webhook/shopify", None, ORDER_CREATE))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Event not handled");
    assert_eq!(ctx.store.counts().await, TableCounts::default());
}

#[tokio::test]
async fn test_per_resource_route_takes_topic_from_path() {
    let ctx = TestContext::new();

    // The header says "products/create"; the path wins.
    let (status, body) = ctx
        .send(signed_request(
            "/webhook/shopify/orders/create",
            Some("products/create"),
            ORDER_CREATE,
        ))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "event": "orders/create"}));
    let counts = ctx.store.counts().await;
    assert_eq!(counts.orders, 1);
    assert_eq!(counts.products, 0);
}

#[tokio::test]
async fn test_every_resource_is_projected() {
    let ctx = TestContext::new();

    for (topic, body) in [
        ("customers/create", r#"{"id":9,"email":"ada@example.com"}"#),
        ("products/create", r#"{"id":42,"title":"Linen Tee","variants":[{}]}"#),
        ("carts/create", r#"{"token":"cart-1","line_items":[{}],"total_price":"12.00"}"#),
        ("orders/create", ORDER_CREATE),
    ] {
        let (status, _) = ctx.post_signed(topic, body).await;
        assert_eq!(status, StatusCode::OK, "{topic}");
    }

    assert_eq!(
        ctx.store.counts().await,
        TableCounts {
            orders: 1,
            customers: 1,
            products: 1,
            carts: 1,
        }
    );
}

// ============================================================================
// Idempotency and deltas
// ============================================================================

#[tokio::test]
async fn test_create_replay_produces_one_record() {
    let ctx = TestContext::new();

    for _ in 0..3 {
        let (status, _) = ctx.post_signed("orders/create", ORDER_CREATE).await;
        assert_eq!(status, StatusCode::OK);
    }

    assert_eq!(ctx.store.counts().await.orders, 1);
    assert_eq!(total_spent(&ctx.store, "9").await, Decimal::new(5000, 2));
}

#[tokio::test]
async fn test_order_update_adjusts_customer_by_delta() {
    let ctx = TestContext::new();

    let (status, _) = ctx
        .post_signed("customers/create", r#"{"id":9,"total_spent":"100.00"}"#)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = ctx.post_signed("orders/create", ORDER_CREATE).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "event": "orders/create"}));

    let order = ctx
        .store
        .find_order(&StoreId::default(), &ShopifyOrderId::new("123"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(order.total_price, Decimal::new(5000, 2));

    let before = total_spent(&ctx.store, "9").await;

    let (status, body) = ctx.post_signed("orders/updated", ORDER_UPDATE).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "event": "orders/updated"}));

    let order = ctx
        .store
        .find_order(&StoreId::default(), &ShopifyOrderId::new("123"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(order.total_price, Decimal::new(7500, 2));
    assert_eq!(total_spent(&ctx.store, "9").await - before, Decimal::new(2500, 2));
}

#[tokio::test]
async fn test_order_moved_between_customers_keeps_totals_consistent() {
    let ctx = TestContext::new();
    ctx.post_signed("orders/create", ORDER_CREATE).await;

    let (status, _) = ctx
        .post_signed(
            "orders/updated",
            r#"{"id":123,"total_price":"60.00","customer":{"id":10}}"#,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(total_spent(&ctx.store, "9").await, Decimal::ZERO);
    assert_eq!(total_spent(&ctx.store, "10").await, Decimal::new(6000, 2));
}

#[tokio::test]
async fn test_update_for_unknown_order_is_acknowledged() {
    let ctx = TestContext::new();
    let (status, body) = ctx.post_signed("orders/updated", ORDER_UPDATE).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Record not found");
    assert_eq!(ctx.store.counts().await, TableCounts::default());
}

// ============================================================================
// Errors
// ============================================================================

#[tokio::test]
async fn test_malformed_payload_is_400() {
    let ctx = TestContext::new();

    let (status, body) = ctx.post_signed("orders/create", "{not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Malformed payload"}));

    let (status, _) = ctx
        .post_signed("orders/create", r#"{"total_price":"5.00"}"#)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(ctx.store.counts().await, TableCounts::default());
}

#[tokio::test]
async fn test_non_object_body_is_400_without_mutation() {
    let ctx = TestContext::new();

    for (topic, body) in [
        ("orders/create", r#"[555, "x@example.com"]"#),
        ("products/create", "[777]"),
        ("customers/create", "9"),
    ] {
        let (status, response) = ctx.post_signed(topic, body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{topic}");
        assert_eq!(response, json!({"error": "Malformed payload"}));
    }

    assert_eq!(ctx.store.counts().await, TableCounts::default());
}

#[tokio::test]
async fn test_storage_failure_acknowledged_by_default() {
    let ctx = TestContext::new();
    ctx.store.set_unavailable(true);

    let (status, body) = ctx.post_signed("orders/create", ORDER_CREATE).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn test_storage_failure_with_retry_policy_is_500() {
    let ctx = TestContext::with_policy(StorageFailurePolicy::Retry);
    ctx.store.set_unavailable(true);

    let (status, body) = ctx.post_signed("orders/create", ORDER_CREATE).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "Internal server error"}));
}

// ============================================================================
// CORS, correlation and health
// ============================================================================

#[tokio::test]
async fn test_cors_preflight() {
    let ctx = TestContext::new();
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/webhook/shopify")
        .header(header::ORIGIN, "https://admin.shopify.com")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "x-shopify-topic")
        .body(Body::empty())
        .unwrap();

    let response = tower::ServiceExt::oneshot(ctx.app.clone(), request)
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}

#[tokio::test]
async fn test_bare_options_request() {
    let ctx = TestContext::new();
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/webhook/shopify")
        .body(Body::empty())
        .unwrap();

    let response = tower::ServiceExt::oneshot(ctx.app.clone(), request)
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    let methods = response.headers()[header::ACCESS_CONTROL_ALLOW_METHODS]
        .to_str()
        .unwrap();
    assert!(methods.contains("POST"));
}

#[tokio::test]
async fn test_webhook_id_is_echoed() {
    let ctx = TestContext::new();
    let mut request = signed_request("/webhook/shopify", Some("orders/create"), ORDER_CREATE);
    request
        .headers_mut()
        .insert("x-shopify-webhook-id", "delivery-7".parse().unwrap());

    let response = tower::ServiceExt::oneshot(ctx.app.clone(), request)
        .await
        .unwrap();

    assert_eq!(response.headers()["x-request-id"], "delivery-7");
}

#[tokio::test]
async fn test_health_and_readiness() {
    let ctx = TestContext::new();
    let get = |uri: &str| {
        Request::builder()
            .uri(uri.to_owned())
            .body(Body::empty())
            .unwrap()
    };

    let (status, body) = ctx.send(get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("ok"));

    let (status, _) = ctx.send(get("/health/ready")).await;
    assert_eq!(status, StatusCode::OK);

    ctx.store.set_unavailable(true);
    let (status, _) = ctx.send(get("/health/ready")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}
