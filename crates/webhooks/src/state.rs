//! Application state shared across handlers.

use std::sync::Arc;

use secrecy::SecretString;
use shopify_insights_core::StoreId;

use crate::config::{StorageFailurePolicy, WebhookConfig};
use crate::refresh::{NotifierError, RefreshNotifier, RefreshState};
use crate::signature::WebhookVerifier;
use crate::store::RecordStore;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    store: Arc<dyn RecordStore>,
    verifier: WebhookVerifier,
    notifier: RefreshNotifier,
    refresh: RefreshState,
    store_id: StoreId,
    storage_failure_policy: StorageFailurePolicy,
}

impl AppState {
    /// Create application state from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the refresh notifier cannot be built.
    pub fn new(config: &WebhookConfig, store: Arc<dyn RecordStore>) -> Result<Self, NotifierError> {
        let notifier = RefreshNotifier::new(&config.refresh)?;

        Ok(Self::builder(store)
            .verifier(WebhookVerifier::new(config.shopify.webhook_secret.clone()))
            .notifier(notifier)
            .store_id(config.shopify.store_id.clone())
            .storage_failure_policy(config.storage_failure_policy)
            .build())
    }

    /// Start building state around `store`.
    ///
    /// Defaults: no webhook secret, disabled notifier, default store ID,
    /// acknowledge storage failures.
    #[must_use]
    pub fn builder(store: Arc<dyn RecordStore>) -> AppStateBuilder {
        AppStateBuilder {
            store,
            verifier: WebhookVerifier::new(None),
            notifier: RefreshNotifier::disabled(),
            store_id: StoreId::default(),
            storage_failure_policy: StorageFailurePolicy::default(),
        }
    }

    /// Get a reference to the record store.
    #[must_use]
    pub fn store(&self) -> &dyn RecordStore {
        self.inner.store.as_ref()
    }

    /// Get a reference to the signature verifier.
    #[must_use]
    pub fn verifier(&self) -> &WebhookVerifier {
        &self.inner.verifier
    }

    /// Get a reference to the dashboard notifier.
    #[must_use]
    pub fn notifier(&self) -> &RefreshNotifier {
        &self.inner.notifier
    }

    /// Get a reference to the last-refresh state.
    #[must_use]
    pub fn refresh(&self) -> &RefreshState {
        &self.inner.refresh
    }

    /// Store that incoming records are attributed to.
    #[must_use]
    pub fn store_id(&self) -> &StoreId {
        &self.inner.store_id
    }

    /// Response policy for storage failures.
    #[must_use]
    pub fn storage_failure_policy(&self) -> StorageFailurePolicy {
        self.inner.storage_failure_policy
    }
}

/// Builder for [`AppState`].
pub struct AppStateBuilder {
    store: Arc<dyn RecordStore>,
    verifier: WebhookVerifier,
    notifier: RefreshNotifier,
    store_id: StoreId,
    storage_failure_policy: StorageFailurePolicy,
}

impl AppStateBuilder {
    /// Verify signatures with `secret`.
    #[must_use]
    pub fn webhook_secret(self, secret: impl Into<String>) -> Self {
        self.verifier(WebhookVerifier::new(Some(SecretString::from(secret.into()))))
    }

    #[must_use]
    pub fn verifier(mut self, verifier: WebhookVerifier) -> Self {
        self.verifier = verifier;
        self
    }

    #[must_use]
    pub fn notifier(mut self, notifier: RefreshNotifier) -> Self {
        self.notifier = notifier;
        self
    }

    #[must_use]
    pub fn store_id(mut self, store_id: StoreId) -> Self {
        self.store_id = store_id;
        self
    }

    #[must_use]
    pub fn storage_failure_policy(mut self, policy: StorageFailurePolicy) -> Self {
        self.storage_failure_policy = policy;
        self
    }

    #[must_use]
    pub fn build(self) -> AppState {
        AppState {
            inner: Arc::new(AppStateInner {
                store: self.store,
                verifier: self.verifier,
                notifier: self.notifier,
                refresh: RefreshState::new(),
                store_id: self.store_id,
                storage_failure_policy: self.storage_failure_policy,
            }),
        }
    }
}
