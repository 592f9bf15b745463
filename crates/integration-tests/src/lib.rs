//! Integration tests for Shopify Insights.
//!
//! # Running Tests
//!
//! ```bash
//! # In-memory tests
//! cargo test -p shopify-insights-integration-tests
//!
//! # Include PostgreSQL-backed tests
//! WEBHOOK_DATABASE_URL=postgres://... cargo test -p shopify-insights-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `webhook_ingestion` - Signature, routing and projection over HTTP
//! - `concurrent_deltas` - Customer totals under concurrent order updates
//! - `refresh_dashboard` - Refresh signal round trip between two live servers
//! - `postgres_store` - `PgRecordStore` against a real database (ignored by default)

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use serde_json::Value;
use shopify_insights_webhooks::config::StorageFailurePolicy;
use shopify_insights_webhooks::refresh::RefreshNotifier;
use shopify_insights_webhooks::signature::{HMAC_HEADER, sign};
use shopify_insights_webhooks::store::{MemoryRecordStore, RecordStore};
use shopify_insights_webhooks::{AppState, app};
use tower::ServiceExt;

/// Secret used by every [`TestContext`].
pub const TEST_SECRET: &str = "it-secret-4b7e91d0c2";

/// Topic header on the combined route.
pub const TOPIC_HEADER: &str = "x-shopify-topic";

/// An application over an in-memory store.
pub struct TestContext {
    pub store: Arc<MemoryRecordStore>,
    pub state: AppState,
    pub app: Router,
}

impl TestContext {
    /// Default context: secret configured, notifier disabled, acknowledge policy.
    #[must_use]
    pub fn new() -> Self {
        Self::with(|builder| builder)
    }

    /// Context with a customised state builder.
    #[must_use]
    pub fn with(
        configure: impl FnOnce(
            shopify_insights_webhooks::state::AppStateBuilder,
        ) -> shopify_insights_webhooks::state::AppStateBuilder,
    ) -> Self {
        let store = Arc::new(MemoryRecordStore::new());
        let dyn_store: Arc<dyn RecordStore> = store.clone();
        let builder = AppState::builder(dyn_store).webhook_secret(TEST_SECRET);
        let state = configure(builder).build();
        let app = app(state.clone());
        Self { store, state, app }
    }

    /// Context whose notifier posts to `notifier`.
    #[must_use]
    pub fn with_notifier(notifier: RefreshNotifier) -> Self {
        Self::with(|builder| builder.notifier(notifier))
    }

    /// Context with the given storage failure policy.
    #[must_use]
    pub fn with_policy(policy: StorageFailurePolicy) -> Self {
        Self::with(|builder| builder.storage_failure_policy(policy))
    }

    /// Send a request through the router.
    ///
    /// # Panics
    ///
    /// Panics if the router fails or the body is not JSON (empty bodies are `Null`).
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body readable");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, json)
    }

    /// POST a correctly signed body to the combined route.
    pub async fn post_signed(&self, topic: &str, body: &str) -> (StatusCode, Value) {
        self.send(signed_request("/webhook/shopify", Some(topic), body))
            .await
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a signed webhook request.
///
/// # Panics
///
/// Panics if the request cannot be built.
#[must_use]
pub fn signed_request(uri: &str, topic: Option<&str>, body: &str) -> Request<Body> {
    webhook_request(uri, topic, Some(&sign(TEST_SECRET, body.as_bytes())), body)
}

/// Build a webhook request with an arbitrary signature header.
///
/// # Panics
///
/// Panics if the request cannot be built.
#[must_use]
pub fn webhook_request(
    uri: &str,
    topic: Option<&str>,
    signature: Option<&str>,
    body: &str,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(topic) = topic {
        builder = builder.header(TOPIC_HEADER, topic);
    }
    if let Some(signature) = signature {
        builder = builder.header(HMAC_HEADER, signature);
    }
    builder
        .body(Body::from(body.to_owned()))
        .expect("valid request")
}
