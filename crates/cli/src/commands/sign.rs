//! Webhook signing command.
//!
//! Prints the value Shopify would send in `X-Shopify-Hmac-Sha256` for a body,
//! for replaying payloads against a local receiver:
//!
//! ```bash
//! curl -X POST http://localhost:3000/webhook/shopify \
//!   -H "x-shopify-topic: orders/create" \
//!   -H "x-shopify-hmac-sha256: $(insights-cli sign --file order.json)" \
//!   --data-binary @order.json
//! ```
//!
//! # Environment Variables
//!
//! - `SHOPIFY_WEBHOOK_SECRET` - Shared webhook secret

use std::path::Path;

use secrecy::{ExposeSecret, SecretString};
use shopify_insights_webhooks::signature;
use thiserror::Error;

/// Errors that can occur while signing.
#[derive(Debug, Error)]
pub enum SignError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
}

/// Sign the file at `path` and print the signature.
///
/// # Errors
///
/// Returns `SignError` if the secret is unset or the file is unreadable.
pub fn run(path: &Path) -> Result<(), SignError> {
    dotenvy::dotenv().ok();

    let secret = std::env::var("SHOPIFY_WEBHOOK_SECRET")
        .ok()
        .filter(|s| !s.is_empty())
        .map(SecretString::from)
        .ok_or(SignError::MissingEnvVar("SHOPIFY_WEBHOOK_SECRET"))?;

    let signature = sign_file(&secret, path)?;

    #[allow(clippy::print_stdout)]
    {
        println!("{signature}");
    }
    Ok(())
}

fn sign_file(secret: &SecretString, path: &Path) -> Result<String, SignError> {
    let body = std::fs::read(path).map_err(|source| SignError::Read {
        path: path.display().to_string(),
        source,
    })?;
    Ok(signature::sign(secret.expose_secret(), &body))
}
