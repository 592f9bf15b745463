//! Field parsers that tolerate Shopify's loose JSON typing.
//!
//! IDs and counts arrive as numbers or strings depending on API version,
//! money arrives as decimal strings. Every parser maps anything it cannot
//! interpret to `None` and leaves defaulting to the caller.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use shopify_insights_core::parse_amount;

/// External ID from a JSON number or non-empty string.
pub fn external_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_owned()),
        _ => None,
    })
}

/// Money amount from a decimal string or JSON number.
pub fn amount<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => parse_amount(&s),
        Some(Value::Number(n)) => parse_amount(&n.to_string()),
        _ => None,
    })
}

/// Integer from a JSON number or numeric string.
pub fn integer<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// RFC 3339 timestamp, normalised to UTC.
pub fn timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        _ => None,
    })
}

/// Free text; numbers are kept in their printed form, blanks become `None`.
pub fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Number of elements in an array field; anything else counts as zero.
pub fn count<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => items.len(),
        _ => 0,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Probe {
        #[serde(default, deserialize_with = "external_id")]
        id: Option<String>,
        #[serde(default, deserialize_with = "amount")]
        price: Option<Decimal>,
        #[serde(default, deserialize_with = "integer")]
        count: Option<i64>,
        #[serde(default, deserialize_with = "timestamp")]
        at: Option<DateTime<Utc>>,
        #[serde(default, deserialize_with = "super::count")]
        items: usize,
    }

    fn probe(json: &str) -> Probe {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_external_id_accepts_numbers_and_strings() {
        assert_eq!(probe(r#"{"id":123}"#).id.as_deref(), Some("123"));
        assert_eq!(probe(r#"{"id":"gid-77"}"#).id.as_deref(), Some("gid-77"));
        assert_eq!(probe(r#"{"id":null}"#).id, None);
        assert_eq!(probe(r#"{"id":"  "}"#).id, None);
        assert_eq!(probe("{}").id, None);
    }

    #[test]
    fn test_amount_parses_strings_and_numbers() {
        assert_eq!(probe(r#"{"price":"50.00"}"#).price, Some(Decimal::new(50, 0)));
        assert_eq!(probe(r#"{"price":19.5}"#).price, Some(Decimal::new(195, 1)));
        assert_eq!(probe(r#"{"price":"free"}"#).price, None);
        assert_eq!(probe(r#"{"price":true}"#).price, None);
    }

    #[test]
    fn test_integer_and_count() {
        let parsed = probe(r#"{"count":"42","items":[1,2,3]}"#);
        assert_eq!(parsed.count, Some(42));
        assert_eq!(parsed.items, 3);
        assert_eq!(probe(r#"{"items":null}"#).items, 0);
    }

    #[test]
    fn test_timestamp_normalises_offset() {
        let parsed = probe(r#"{"at":"2026-10-15T10:00:00-04:00"}"#);
        assert_eq!(
            parsed.at.unwrap().to_rfc3339(),
            "2026-10-15T14:00:00+00:00"
        );
        assert_eq!(probe(r#"{"at":"yesterday"}"#).at, None);
    }
}
