//! Webhook delivery ID middleware for request tracing and correlation.
//!
//! Shopify sends a unique `X-Shopify-Webhook-Id` per delivery. Redeliveries of
//! the same event reuse it, which makes it the natural correlation key. When
//! absent (refresh calls, health checks) a UUID v4 is generated. The ID is:
//! - Recorded in the current tracing span
//! - Added to the Sentry scope for error correlation
//! - Returned in the `x-request-id` response header

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use tracing::Span;
use uuid::Uuid;

/// Header Shopify uses for the delivery ID.
pub const WEBHOOK_ID_HEADER: &str = "x-shopify-webhook-id";

/// Response header echoing the ID.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Middleware that tags every request with a delivery ID.
pub async fn webhook_id_middleware(request: Request, next: Next) -> Response {
    let webhook_id = request
        .headers()
        .get(WEBHOOK_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .filter(|id| !id.is_empty())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    Span::current().record("webhook_id", &webhook_id);

    sentry::configure_scope(|scope| {
        scope.set_tag("webhook_id", &webhook_id);
    });

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&webhook_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{Router, body::Body, http::Request as HttpRequest, middleware, routing::get};
    use tower::ServiceExt;

    use super::*;

    fn app() -> Router {
        Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(middleware::from_fn(webhook_id_middleware))
    }

    #[tokio::test]
    async fn test_echoes_shopify_webhook_id() {
        let response = app()
            .oneshot(
                HttpRequest::builder()
                    .uri("/")
                    .header(WEBHOOK_ID_HEADER, "b54557e4-bdd9-4b37-8a5f-bf7d70bcd043")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.headers()[REQUEST_ID_HEADER],
            "b54557e4-bdd9-4b37-8a5f-bf7d70bcd043"
        );
    }

    #[tokio::test]
    async fn test_generates_id_when_missing() {
        let response = app()
            .oneshot(HttpRequest::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let id = response.headers()[REQUEST_ID_HEADER].to_str().unwrap();
        assert!(Uuid::parse_str(id).is_ok());
    }
}
