//! Per-resource webhook handlers.
//!
//! A handler maps one verified payload onto the record store and reports what
//! it did. Handlers never decide the HTTP response; the dispatcher does.

pub mod carts;
pub mod customers;
pub mod orders;
pub mod products;

use chrono::{DateTime, Utc};
use shopify_insights_core::StoreId;
use thiserror::Error;

use crate::payloads::PayloadError;
use crate::refresh::RefreshNotifier;
use crate::store::{InsertOutcome, RecordStore, StoreError};

/// Everything a handler needs for one event.
#[derive(Clone, Copy)]
pub struct HandlerContext<'a> {
    pub store: &'a dyn RecordStore,
    pub store_id: &'a StoreId,
    pub notifier: &'a RefreshNotifier,
    /// Fallback for timestamps the payload omits.
    pub received_at: DateTime<Utc>,
}

/// What a handler did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerOutcome {
    Created,
    Updated,
    /// A redelivered create left the existing record untouched.
    Duplicate,
    /// An update targeted a record that does not exist.
    NotFound,
}

impl HandlerOutcome {
    /// Short note for the acknowledgement body, if the outcome is unusual.
    #[must_use]
    pub const fn message(self) -> Option<&'static str> {
        match self {
            Self::Created | Self::Updated => None,
            Self::Duplicate => Some("Duplicate event"),
            Self::NotFound => Some("Record not found"),
        }
    }
}

impl From<InsertOutcome> for HandlerOutcome {
    fn from(outcome: InsertOutcome) -> Self {
        match outcome {
            InsertOutcome::Inserted => Self::Created,
            InsertOutcome::Updated => Self::Updated,
            InsertOutcome::Duplicate => Self::Duplicate,
        }
    }
}

/// Maps the `found` flag of a field update.
const fn updated_or_missing(found: bool) -> HandlerOutcome {
    if found {
        HandlerOutcome::Updated
    } else {
        HandlerOutcome::NotFound
    }
}

/// Errors a handler can return.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Payload(#[from] PayloadError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
