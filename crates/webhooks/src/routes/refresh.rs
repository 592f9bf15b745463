//! Dashboard refresh endpoint.
//!
//! `POST` records a refresh signal; `GET` reports the last one and whether
//! it is recent enough for the UI to treat its data as fresh.

use axum::{Json, Router, body::Bytes, extract::State, routing::get};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::WebhookError;
use crate::state::AppState;

/// Create refresh routes.
pub fn router() -> Router<AppState> {
    Router::new().route("/refresh-dashboard", get(status).post(trigger))
}

#[derive(Debug, Deserialize)]
struct RefreshRequest {
    #[serde(default)]
    event: Option<String>,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct RefreshTriggered {
    success: bool,
    message: &'static str,
    event: Option<String>,
    timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshStatus {
    message: &'static str,
    timestamp: DateTime<Utc>,
    has_recent_refresh: bool,
}

async fn trigger(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<RefreshTriggered>, WebhookError> {
    let request: RefreshRequest = serde_json::from_slice(&body).map_err(|e| {
        tracing::warn!(error = %e, "Unreadable refresh request");
        WebhookError::BadRequest("Failed to trigger refresh")
    })?;

    let now = Utc::now();
    state.refresh().record(now).await;
    tracing::info!(event = ?request.event, data = %request.data, "Dashboard refresh triggered");

    Ok(Json(RefreshTriggered {
        success: true,
        message: "Dashboard refresh triggered",
        event: request.event,
        timestamp: now,
    }))
}

async fn status(State(state): State<AppState>) -> Json<RefreshStatus> {
    let now = Utc::now();
    let snapshot = state.refresh().snapshot(now).await;

    Json(RefreshStatus {
        message: "Dashboard refresh endpoint is active",
        timestamp: snapshot.last.unwrap_or(now),
        has_recent_refresh: snapshot.has_recent_refresh,
    })
}
