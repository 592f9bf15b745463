//! Shopify webhook ingestion routes.
//!
//! Both routes verify the signature over the raw body before anything is
//! parsed, then hand the body to the dispatcher.

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, HeaderName, Method, header},
    routing::post,
};
use tower_http::cors::{Any, CorsLayer};
use tracing::instrument;

use crate::dispatch::{TOPIC_HEADER, WebhookAck, dispatch};
use crate::error::WebhookError;
use crate::signature::HMAC_HEADER;
use crate::state::AppState;

/// Create webhook routes.
///
/// Every `OPTIONS` request, preflight or not, is answered by the CORS layer
/// with `200` and wildcard headers.
pub fn router() -> Router<AppState> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static(TOPIC_HEADER),
            HeaderName::from_static(HMAC_HEADER),
        ]);

    Router::new()
        .route("/webhook/shopify", post(combined))
        .route("/webhook/shopify/{resource}/{event}", post(per_resource))
        .layer(cors)
}

/// Combined route: the topic comes from `X-Shopify-Topic`.
#[instrument(skip(state, headers, body), fields(topic))]
async fn combined(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, WebhookError> {
    let topic = header_str(&headers, TOPIC_HEADER).unwrap_or_default();
    tracing::Span::current().record("topic", topic);
    receive(&state, topic, &headers, &body).await
}

/// Per-resource route: the topic is `{resource}/{event}` and the header is ignored.
#[instrument(skip(state, headers, body), fields(topic))]
async fn per_resource(
    State(state): State<AppState>,
    Path((resource, event)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, WebhookError> {
    let topic = format!("{resource}/{event}");
    tracing::Span::current().record("topic", topic.as_str());
    receive(&state, &topic, &headers, &body).await
}

async fn receive(
    state: &AppState,
    topic: &str,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<Json<WebhookAck>, WebhookError> {
    state
        .verifier()
        .verify(body, header_str(headers, HMAC_HEADER))?;

    tracing::debug!(topic = %topic, bytes = body.len(), "Webhook signature verified");

    let ack = dispatch(state, topic, body).await?;
    Ok(Json(ack))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
