//! Webhook receiver configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `WEBHOOK_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! ## Optional
//! - `WEBHOOK_HOST` - Bind address (default: 0.0.0.0)
//! - `WEBHOOK_PORT` - Listen port (default: 3000)
//! - `SHOPIFY_WEBHOOK_SECRET` - Shared HMAC secret. When unset every signature check fails.
//! - `SHOPIFY_STORE_ID` - Store identifier scoping stored records (default: default-store)
//! - `DASHBOARD_BASE_URL` - Base URL of the dashboard refresh endpoint (default: <http://localhost:3000>)
//! - `REFRESH_TIMEOUT_SECS` - Timeout for the refresh notification, 1-30 (default: 3)
//! - `STORAGE_FAILURE_POLICY` - `acknowledge` or `retry` (default: acknowledge)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` / `SENTRY_TRACES_SAMPLE_RATE` - Sentry sample rates (default: 1.0)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use shopify_insights_core::StoreId;
use thiserror::Error;
use url::Url;

const DEFAULT_DASHBOARD_BASE_URL: &str = "http://localhost:3000";
const DEFAULT_REFRESH_TIMEOUT_SECS: u64 = 3;
const MAX_REFRESH_TIMEOUT_SECS: u64 = 30;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "insert",
    "put-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// What the webhook endpoint answers when persisting an event fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageFailurePolicy {
    /// Log the failure and still answer 200 so Shopify does not retry.
    #[default]
    Acknowledge,
    /// Answer 500 so Shopify redelivers the event.
    Retry,
}

impl FromStr for StorageFailurePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "acknowledge" | "ack" => Ok(Self::Acknowledge),
            "retry" => Ok(Self::Retry),
            other => Err(ConfigError::InvalidEnvVar(
                "STORAGE_FAILURE_POLICY".to_string(),
                format!("expected 'acknowledge' or 'retry', got '{other}'"),
            )),
        }
    }
}

/// Webhook receiver configuration.
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Shopify webhook verification settings
    pub shopify: ShopifyWebhookConfig,
    /// Downstream dashboard refresh settings
    pub refresh: RefreshConfig,
    /// Response policy for storage failures
    pub storage_failure_policy: StorageFailurePolicy,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// Shopify webhook configuration.
///
/// Implements `Debug` manually to redact the shared secret.
#[derive(Clone)]
pub struct ShopifyWebhookConfig {
    /// Shared secret used to sign webhook bodies. `None` fails every check.
    pub webhook_secret: Option<SecretString>,
    /// Store that every incoming record is attributed to.
    pub store_id: StoreId,
}

impl std::fmt::Debug for ShopifyWebhookConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let secret = if self.webhook_secret.is_some() {
            "[REDACTED]"
        } else {
            "[UNSET]"
        };
        f.debug_struct("ShopifyWebhookConfig")
            .field("webhook_secret", &secret)
            .field("store_id", &self.store_id)
            .finish()
    }
}

/// Dashboard refresh notification configuration.
#[derive(Debug, Clone)]
pub struct RefreshConfig {
    /// Base URL that `/refresh-dashboard` is appended to.
    pub base_url: Url,
    /// Upper bound on the outbound call.
    pub timeout: Duration,
}

impl WebhookConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("WEBHOOK_DATABASE_URL")?;
        let host = get_env_or_default("WEBHOOK_HOST", "0.0.0.0")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("WEBHOOK_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("WEBHOOK_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("WEBHOOK_PORT".to_string(), e.to_string()))?;

        let shopify = ShopifyWebhookConfig::from_env();
        let refresh = RefreshConfig::from_env()?;
        let storage_failure_policy = get_optional_env("STORAGE_FAILURE_POLICY")
            .map(|raw| raw.parse::<StorageFailurePolicy>())
            .transpose()?
            .unwrap_or_default();

        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);

        Ok(Self {
            database_url,
            host,
            port,
            shopify,
            refresh,
            storage_failure_policy,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl ShopifyWebhookConfig {
    /// Load Shopify webhook settings from environment.
    ///
    /// A missing secret is not an error: the receiver still starts, but
    /// rejects every webhook until the secret is provided.
    fn from_env() -> Self {
        let webhook_secret = get_optional_env("SHOPIFY_WEBHOOK_SECRET")
            .filter(|s| !s.is_empty())
            .map(|secret| {
                if let Err(e) = validate_secret_strength(&secret, "SHOPIFY_WEBHOOK_SECRET") {
                    tracing::warn!("SHOPIFY_WEBHOOK_SECRET validation warning: {e}");
                }
                SecretString::from(secret)
            });

        let store_id = get_optional_env("SHOPIFY_STORE_ID")
            .filter(|s| !s.trim().is_empty())
            .map_or_else(StoreId::default, StoreId::new);

        Self {
            webhook_secret,
            store_id,
        }
    }
}

impl RefreshConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let raw_url = get_env_or_default("DASHBOARD_BASE_URL", DEFAULT_DASHBOARD_BASE_URL);
        let base_url = Url::parse(&raw_url).map_err(|e| {
            ConfigError::InvalidEnvVar("DASHBOARD_BASE_URL".to_string(), e.to_string())
        })?;

        let timeout_secs = get_optional_env("REFRESH_TIMEOUT_SECS")
            .map(|raw| {
                raw.parse::<u64>().map_err(|e| {
                    ConfigError::InvalidEnvVar("REFRESH_TIMEOUT_SECS".to_string(), e.to_string())
                })
            })
            .transpose()?
            .unwrap_or(DEFAULT_REFRESH_TIMEOUT_SECS);
        let timeout = validate_refresh_timeout(timeout_secs)?;

        Ok(Self { base_url, timeout })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL` (used by Fly.io postgres attach).
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = get_required_env(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn validate_refresh_timeout(secs: u64) -> Result<Duration, ConfigError> {
    if secs == 0 || secs > MAX_REFRESH_TIMEOUT_SECS {
        return Err(ConfigError::InvalidEnvVar(
            "REFRESH_TIMEOUT_SECS".to_string(),
            format!("must be between 1 and {MAX_REFRESH_TIMEOUT_SECS} (got {secs})"),
        ));
    }
    Ok(Duration::from_secs(secs))
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-webhook-secret", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_secret_strength_random_hex() {
        let result = validate_secret_strength("9f2c4e71b0d85a36e4c1f7a2d9b3086e", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_storage_failure_policy_parse() {
        assert_eq!(
            "acknowledge".parse::<StorageFailurePolicy>().unwrap(),
            StorageFailurePolicy::Acknowledge
        );
        assert_eq!(
            " RETRY ".parse::<StorageFailurePolicy>().unwrap(),
            StorageFailurePolicy::Retry
        );
        assert!("drop".parse::<StorageFailurePolicy>().is_err());
    }

    #[test]
    fn test_refresh_timeout_bounds() {
        assert!(validate_refresh_timeout(0).is_err());
        assert!(validate_refresh_timeout(31).is_err());
        assert_eq!(validate_refresh_timeout(3).unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn test_socket_addr() {
        let config = WebhookConfig {
            database_url: SecretString::from("postgres://localhost/insights"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            shopify: ShopifyWebhookConfig {
                webhook_secret: None,
                store_id: StoreId::default(),
            },
            refresh: RefreshConfig {
                base_url: Url::parse(DEFAULT_DASHBOARD_BASE_URL).unwrap(),
                timeout: Duration::from_secs(DEFAULT_REFRESH_TIMEOUT_SECS),
            },
            storage_failure_policy: StorageFailurePolicy::default(),
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 1.0,
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_shopify_webhook_config_debug_redacts_secret() {
        let config = ShopifyWebhookConfig {
            webhook_secret: Some(SecretString::from("shpss_super_secret_value")),
            store_id: StoreId::new("store-1"),
        };

        let debug_output = format!("{config:?}");

        assert!(debug_output.contains("store-1"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("shpss_super_secret_value"));
    }
}
