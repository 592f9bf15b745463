//! Dashboard refresh signalling.
//!
//! [`RefreshNotifier`] tells the dashboard that data changed. The dashboard
//! side of the exchange is the `/refresh-dashboard` endpoint, which records
//! the time of the last signal in [`RefreshState`].
//!
//! The state is process-local and resets on restart. It only drives UI
//! staleness hints.

pub mod notifier;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;

pub use notifier::{NotifierError, RefreshData, RefreshEvent, RefreshNotifier};

/// How long a refresh counts as recent, in seconds.
pub const FRESHNESS_WINDOW_SECS: i64 = 10;

/// Timestamp of the most recent refresh signal.
#[derive(Debug, Default)]
pub struct RefreshState {
    last: RwLock<Option<DateTime<Utc>>>,
}

/// Point-in-time view of [`RefreshState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshSnapshot {
    /// Last refresh, if any since start-up.
    pub last: Option<DateTime<Utc>>,
    /// Whether `last` falls within [`FRESHNESS_WINDOW_SECS`] of the snapshot time.
    pub has_recent_refresh: bool,
}

impl RefreshState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the last refresh time.
    pub async fn record(&self, at: DateTime<Utc>) {
        *self.last.write().await = Some(at);
    }

    /// The last refresh time.
    pub async fn last(&self) -> Option<DateTime<Utc>> {
        *self.last.read().await
    }

    /// Read the state as of `now`.
    pub async fn snapshot(&self, now: DateTime<Utc>) -> RefreshSnapshot {
        let last = self.last().await;
        let window = Duration::seconds(FRESHNESS_WINDOW_SECS);
        let has_recent_refresh = last.is_some_and(|at| now - at < window);
        RefreshSnapshot {
            last,
            has_recent_refresh,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_state_is_not_recent() {
        let state = RefreshState::new();
        let snapshot = state.snapshot(Utc::now()).await;
        assert_eq!(snapshot.last, None);
        assert!(!snapshot.has_recent_refresh);
    }

    #[tokio::test]
    async fn test_freshness_window() {
        let state = RefreshState::new();
        let at = Utc::now();
        state.record(at).await;

        assert!(state.snapshot(at + Duration::seconds(9)).await.has_recent_refresh);
        assert!(!state.snapshot(at + Duration::seconds(10)).await.has_recent_refresh);
        assert!(!state.snapshot(at + Duration::minutes(5)).await.has_recent_refresh);
    }

    #[tokio::test]
    async fn test_record_overwrites() {
        let state = RefreshState::new();
        let first = Utc::now();
        let second = first + Duration::seconds(30);
        state.record(first).await;
        state.record(second).await;
        assert_eq!(state.last().await, Some(second));
    }
}
