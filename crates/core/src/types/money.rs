//! Decimal money amounts and currency codes.
//!
//! Shopify sends monetary values as decimal strings (`"50.00"`). They are
//! kept as [`Decimal`] end to end so that customer totals never accumulate
//! floating point drift.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Parse a monetary amount from its string representation.
///
/// Surrounding whitespace is ignored. Returns `None` for empty or
/// unparseable input so callers can apply their own defaulting rule.
///
/// ```rust
/// # use shopify_insights_core::parse_amount;
/// # use rust_decimal::Decimal;
/// assert_eq!(parse_amount("50.00"), Some(Decimal::new(5000, 2)));
/// assert_eq!(parse_amount("not-a-number"), None);
/// ```
#[must_use]
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .ok()
}

/// ISO 4217 currency code, normalised to upper case.
///
/// Shopify supports far more currencies than are worth enumerating, so the
/// code is kept as text. Anything that is not three ASCII letters falls back
/// to the default (`USD`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Parse a currency code, falling back to `USD` when absent or invalid.
    #[must_use]
    pub fn parse_or_default(raw: Option<&str>) -> Self {
        raw.map(str::trim)
            .filter(|code| code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()))
            .map_or_else(Self::default, |code| Self(code.to_ascii_uppercase()))
    }

    /// The three-letter code.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CurrencyCode {
    fn default() -> Self {
        Self("USD".to_owned())
    }
}

impl std::fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_amount_trims_whitespace() {
        assert_eq!(parse_amount(" 12.5 "), Some(Decimal::new(125, 1)));
    }

    #[test]
    fn test_parse_amount_rejects_garbage() {
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("abc"), None);
        assert_eq!(parse_amount("12,50"), None);
    }

    #[test]
    fn test_currency_code_normalises_case() {
        assert_eq!(CurrencyCode::parse_or_default(Some("eur")).as_str(), "EUR");
    }

    #[test]
    fn test_currency_code_defaults_to_usd() {
        assert_eq!(CurrencyCode::parse_or_default(None).as_str(), "USD");
        assert_eq!(CurrencyCode::parse_or_default(Some("")).as_str(), "USD");
        assert_eq!(CurrencyCode::parse_or_default(Some("dollars")).as_str(), "USD");
    }
}
