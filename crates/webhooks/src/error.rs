//! Unified error handling for the webhook receiver.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::payloads::PayloadError;
use crate::signature::SignatureError;
use crate::store::StoreError;

/// HTTP-facing error type.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Signature verification failed.
    #[error("Unauthorized: {0}")]
    Unauthorized(#[from] SignatureError),

    /// Body could not be mapped to the topic's schema.
    #[error("Malformed payload: {0}")]
    MalformedPayload(#[from] PayloadError),

    /// Storage failed and the policy asks the sender to retry.
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    /// Bad request with a fixed public message.
    #[error("Bad request: {0}")]
    BadRequest(&'static str),
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        // Log server errors with Sentry
        if matches!(self, Self::Storage(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Webhook request error"
            );
        } else {
            tracing::warn!(error = %self, "Webhook request rejected");
        }

        let status = match &self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::MalformedPayload(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Unauthorized(_) => "Invalid HMAC",
            Self::MalformedPayload(_) => "Malformed payload",
            Self::BadRequest(message) => *message,
            Self::Storage(_) => "Internal server error",
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
