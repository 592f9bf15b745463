//! Shopify webhook signature verification.
//!
//! Shopify signs every webhook with `base64(HMAC-SHA256(secret, body))` and
//! sends the result in the `X-Shopify-Hmac-Sha256` header. The MAC must be
//! computed over the exact bytes received, before any JSON parsing.
//!
//! Verification fails closed: a missing header, a missing secret or a
//! mismatch all reject the request.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use thiserror::Error;

/// Header carrying the base64 encoded MAC.
pub const HMAC_HEADER: &str = "x-shopify-hmac-sha256";

type HmacSha256 = Hmac<Sha256>;

/// Reasons a webhook fails authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SignatureError {
    /// The request carried no signature header.
    #[error("signature header missing")]
    MissingSignature,
    /// No webhook secret is configured.
    #[error("webhook secret not configured")]
    MissingSecret,
    /// The signature does not match the body.
    #[error("signature mismatch")]
    Mismatch,
}

/// Verifies webhook bodies against the shared secret.
///
/// Implements `Debug` manually to redact the secret.
#[derive(Clone)]
pub struct WebhookVerifier {
    secret: Option<SecretString>,
}

impl std::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookVerifier")
            .field("configured", &self.is_configured())
            .finish()
    }
}

impl WebhookVerifier {
    /// Create a verifier. `None` produces a verifier that rejects everything.
    #[must_use]
    pub const fn new(secret: Option<SecretString>) -> Self {
        Self { secret }
    }

    /// Whether a non-empty secret is available.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.secret
            .as_ref()
            .is_some_and(|s| !s.expose_secret().is_empty())
    }

    /// Verify `signature` against the raw request body.
    ///
    /// The comparison is constant time over the decoded MAC bytes.
    ///
    /// # Errors
    ///
    /// Returns the first reason the request cannot be authenticated.
    pub fn verify(&self, body: &[u8], signature: Option<&str>) -> Result<(), SignatureError> {
        let secret = self
            .secret
            .as_ref()
            .map(ExposeSecret::expose_secret)
            .filter(|s| !s.is_empty())
            .ok_or(SignatureError::MissingSecret)?;

        let signature = signature
            .filter(|s| !s.is_empty())
            .ok_or(SignatureError::MissingSignature)?;

        let provided = BASE64
            .decode(signature)
            .map_err(|_| SignatureError::Mismatch)?;

        let mut mac =
            HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::Mismatch)?;
        mac.update(body);
        mac.verify_slice(&provided)
            .map_err(|_| SignatureError::Mismatch)
    }
}

/// Compute the signature Shopify would send for `body`.
///
/// Used by the CLI and by tests to produce valid requests.
#[must_use]
pub fn sign(secret: &str, body: &[u8]) -> String {
    // HMAC accepts keys of any length, so this cannot fail.
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(body);
    BASE64.encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "hush-7f3a9c2e51";
    const BODY: &[u8] = br#"{"id":123,"total_price":"50.00","customer":{"id":9}}"#;

    fn verifier() -> WebhookVerifier {
        WebhookVerifier::new(Some(SecretString::from(SECRET)))
    }

    #[test]
    fn test_accepts_exact_signature() {
        let signature = sign(SECRET, BODY);
        assert_eq!(verifier().verify(BODY, Some(&signature)), Ok(()));
    }

    #[test]
    fn test_known_vector() {
        assert_eq!(
            sign("key", b"The quick brown fox jumps over the lazy dog"),
            "97yD9DBThCSxMpjmqm+xQ+9NWaFJRhdZl0edvC0aPNg="
        );
    }

    #[test]
    fn test_rejects_any_single_byte_mutation() {
        let signature = sign(SECRET, BODY);
        for index in 0..BODY.len() {
            let mut mutated = BODY.to_vec();
            if let Some(byte) = mutated.get_mut(index) {
                *byte ^= 0x01;
            }
            assert_eq!(
                verifier().verify(&mutated, Some(&signature)),
                Err(SignatureError::Mismatch),
                "mutation at byte {index} was accepted"
            );
        }
    }

    #[test]
    fn test_rejects_missing_header() {
        assert_eq!(
            verifier().verify(BODY, None),
            Err(SignatureError::MissingSignature)
        );
        assert_eq!(
            verifier().verify(BODY, Some("")),
            Err(SignatureError::MissingSignature)
        );
    }

    #[test]
    fn test_rejects_when_secret_missing() {
        let signature = sign("", BODY);
        let unconfigured = WebhookVerifier::new(None);
        assert_eq!(
            unconfigured.verify(BODY, Some(&signature)),
            Err(SignatureError::MissingSecret)
        );

        let empty = WebhookVerifier::new(Some(SecretString::from("")));
        assert!(!empty.is_configured());
        assert_eq!(
            empty.verify(BODY, Some(&signature)),
            Err(SignatureError::MissingSecret)
        );
    }

    #[test]
    fn test_rejects_wrong_secret_and_garbage() {
        let signature = sign("another-secret", BODY);
        assert_eq!(
            verifier().verify(BODY, Some(&signature)),
            Err(SignatureError::Mismatch)
        );
        assert_eq!(
            verifier().verify(BODY, Some("not base64 at all!")),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_debug_redacts_secret() {
        let output = format!("{:?}", verifier());
        assert!(!output.contains(SECRET));
        assert!(output.contains("configured: true"));
    }
}
