//! HTTP routes for the webhook receiver.
//!
//! # Route Structure
//!
//! ```text
//! GET     /health                              - Liveness
//! GET     /health/ready                        - Readiness (store ping)
//!
//! # Shopify webhooks (HMAC verified)
//! POST    /webhook/shopify                     - Combined route, topic from X-Shopify-Topic
//! OPTIONS /webhook/shopify[/...]                - Answered by the CORS layer
//! POST    /webhook/shopify/{resource}/{event}  - Per-resource route, topic from path
//!
//! # Dashboard refresh
//! POST    /refresh-dashboard                   - Record a refresh signal
//! GET     /refresh-dashboard                   - Last refresh and freshness
//! ```

pub mod health;
pub mod refresh;
pub mod webhooks;

use axum::{Router, middleware};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::middleware::webhook_id_middleware;
use crate::state::AppState;

/// Build the full application router with its middleware stack.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(webhooks::router())
        .merge(refresh::router())
        .layer(middleware::from_fn(webhook_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        webhook_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}
