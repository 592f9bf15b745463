//! Topic routing.
//!
//! Maps a Shopify topic to exactly one handler. Unknown topics are
//! acknowledged without touching storage so Shopify stops redelivering
//! events this service ignores.

use std::fmt;

use chrono::Utc;
use serde::Serialize;

use crate::config::StorageFailurePolicy;
use crate::error::WebhookError;
use crate::handlers::{self, HandlerContext, HandlerError, HandlerOutcome};
use crate::state::AppState;

/// Header carrying the topic on the combined route.
pub const TOPIC_HEADER: &str = "x-shopify-topic";

/// Topics with a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    OrdersCreate,
    OrdersUpdated,
    OrdersFulfilled,
    OrdersCancelled,
    CustomersCreate,
    CustomersUpdate,
    ProductsCreate,
    ProductsUpdate,
    CartsCreate,
    CartsUpdate,
}

impl Topic {
    /// Look up a topic; `None` means the event is ignored.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "orders/create" => Some(Self::OrdersCreate),
            "orders/updated" => Some(Self::OrdersUpdated),
            "orders/fulfilled" => Some(Self::OrdersFulfilled),
            "orders/cancelled" => Some(Self::OrdersCancelled),
            "customers/create" => Some(Self::CustomersCreate),
            "customers/updated" | "customers/update" => Some(Self::CustomersUpdate),
            "products/create" => Some(Self::ProductsCreate),
            "products/update" => Some(Self::ProductsUpdate),
            "carts/create" => Some(Self::CartsCreate),
            "carts/update" => Some(Self::CartsUpdate),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OrdersCreate => "orders/create",
            Self::OrdersUpdated => "orders/updated",
            Self::OrdersFulfilled => "orders/fulfilled",
            Self::OrdersCancelled => "orders/cancelled",
            Self::CustomersCreate => "customers/create",
            Self::CustomersUpdate => "customers/updated",
            Self::ProductsCreate => "products/create",
            Self::ProductsUpdate => "products/update",
            Self::CartsCreate => "carts/create",
            Self::CartsUpdate => "carts/update",
        }
    }

    async fn handle(
        self,
        ctx: HandlerContext<'_>,
        body: &[u8],
    ) -> Result<HandlerOutcome, HandlerError> {
        match self {
            Self::OrdersCreate => handlers::orders::create(ctx, body).await,
            Self::OrdersUpdated => handlers::orders::update(ctx, body).await,
            Self::OrdersFulfilled => handlers::orders::fulfilled(ctx, body).await,
            Self::OrdersCancelled => handlers::orders::cancelled(ctx, body).await,
            Self::CustomersCreate => handlers::customers::create(ctx, body).await,
            Self::CustomersUpdate => handlers::customers::update(ctx, body).await,
            Self::ProductsCreate => handlers::products::create(ctx, body).await,
            Self::ProductsUpdate => handlers::products::update(ctx, body).await,
            Self::CartsCreate => handlers::carts::create(ctx, body).await,
            Self::CartsUpdate => handlers::carts::update(ctx, body).await,
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Successful webhook response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebhookAck {
    pub success: bool,
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

impl WebhookAck {
    fn new(event: &str, message: Option<&'static str>) -> Self {
        Self {
            success: true,
            event: event.to_string(),
            message,
        }
    }
}

/// Route a verified body to its handler.
///
/// Storage failures follow the configured [`StorageFailurePolicy`].
///
/// # Errors
///
/// Returns `WebhookError::MalformedPayload` for bodies that do not fit the
/// topic's schema, and `WebhookError::Storage` for storage failures under
/// [`StorageFailurePolicy::Retry`].
pub async fn dispatch(
    state: &AppState,
    topic: &str,
    body: &[u8],
) -> Result<WebhookAck, WebhookError> {
    let Some(known) = Topic::parse(topic) else {
        tracing::info!(topic = %topic, "Unhandled webhook topic");
        return Ok(WebhookAck::new(topic, Some("Event not handled")));
    };

    let ctx = HandlerContext {
        store: state.store(),
        store_id: state.store_id(),
        notifier: state.notifier(),
        received_at: Utc::now(),
    };

    match known.handle(ctx, body).await {
        Ok(outcome) => Ok(WebhookAck::new(topic, outcome.message())),
        Err(HandlerError::Payload(e)) => Err(WebhookError::MalformedPayload(e)),
        Err(HandlerError::Store(e)) => match state.storage_failure_policy() {
            StorageFailurePolicy::Acknowledge => {
                let event_id = sentry::capture_error(&e);
                tracing::error!(
                    topic = %known,
                    error = %e,
                    sentry_event_id = %event_id,
                    "Storage failed, acknowledging webhook"
                );
                Ok(WebhookAck::new(topic, None))
            }
            StorageFailurePolicy::Retry => Err(WebhookError::Storage(e)),
        },
    }
}
