//! Best-effort outbound refresh call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shopify_insights_core::{ShopifyCustomerId, ShopifyOrderId};
use thiserror::Error;
use url::Url;

use crate::config::RefreshConfig;

/// Path appended to the dashboard base URL.
const REFRESH_PATH: &str = "refresh-dashboard";

/// Errors that can occur when signalling the dashboard.
#[derive(Debug, Error)]
pub enum NotifierError {
    /// HTTP request failed or timed out.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Dashboard answered with a non-success status.
    #[error("dashboard returned {0}")]
    Status(u16),

    /// Base URL cannot carry the refresh path.
    #[error("invalid refresh URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Correlation data carried by a refresh signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshData {
    pub order_id: ShopifyOrderId,
    pub customer_id: Option<ShopifyCustomerId>,
}

/// Body posted to the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshEvent {
    pub event: String,
    pub data: RefreshData,
    pub timestamp: DateTime<Utc>,
}

impl RefreshEvent {
    /// Signal for an updated order.
    #[must_use]
    pub fn order_updated(
        order_id: ShopifyOrderId,
        customer_id: Option<ShopifyCustomerId>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            event: "orders/updated".to_string(),
            data: RefreshData {
                order_id,
                customer_id,
            },
            timestamp,
        }
    }
}

/// Posts [`RefreshEvent`]s to the dashboard. No retries.
#[derive(Debug, Clone)]
pub struct RefreshNotifier {
    client: reqwest::Client,
    endpoint: Option<Url>,
}

impl RefreshNotifier {
    /// Create a notifier posting to `{base_url}/refresh-dashboard`.
    ///
    /// # Errors
    ///
    /// Returns error if the URL is unusable or the HTTP client fails to build.
    pub fn new(config: &RefreshConfig) -> Result<Self, NotifierError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            endpoint: Some(refresh_endpoint(&config.base_url)?),
        })
    }

    /// A notifier that never sends anything.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: None,
        }
    }

    /// Target URL, if enabled.
    #[must_use]
    pub const fn endpoint(&self) -> Option<&Url> {
        self.endpoint.as_ref()
    }

    /// Send `event` once.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the dashboard rejects it.
    pub async fn send(&self, event: &RefreshEvent) -> Result<(), NotifierError> {
        let Some(endpoint) = &self.endpoint else {
            return Ok(());
        };

        let response = self.client.post(endpoint.clone()).json(event).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(NotifierError::Status(status.as_u16()));
        }
        Ok(())
    }

    /// Send `event`, logging and discarding any failure.
    pub async fn notify(&self, event: &RefreshEvent) {
        match self.send(event).await {
            Ok(()) => {
                tracing::debug!(event = %event.event, order_id = %event.data.order_id, "Dashboard refresh sent");
            }
            Err(e) => {
                tracing::warn!(
                    event = %event.event,
                    order_id = %event.data.order_id,
                    error = %e,
                    "Dashboard refresh failed"
                );
            }
        }
    }
}

/// Append the refresh path to `base`, keeping any existing path prefix.
fn refresh_endpoint(base: &Url) -> Result<Url, url::ParseError> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(REFRESH_PATH)
}
