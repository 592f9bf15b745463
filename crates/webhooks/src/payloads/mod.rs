//! Typed webhook payload schemas.
//!
//! Each resource has an explicit serde struct validated at the boundary.
//! Parsing is lenient about field types (see [`lenient`]) but strict about
//! identity: a payload without its external ID is rejected.
//!
//! Defaulting rules applied when mapping to records:
//!
//! | Field | Fallback |
//! |-------|----------|
//! | money | `0` (`subtotal_price` falls back to `total_price`) |
//! | `financial_status` | `unknown` |
//! | `fulfillment_status` | `unfulfilled` |
//! | `currency` | `USD` |
//! | `order_number` | leading digits of `name` after `#`, then `0` |
//! | timestamps (`processed_at` included) | time of processing |

pub mod cart;
pub mod customer;
pub mod lenient;
pub mod order;
pub mod product;

use serde::de::{DeserializeOwned, Error as _};
use serde_json::Value;
use thiserror::Error;

pub use cart::CartPayload;
pub use customer::CustomerPayload;
pub use order::{CustomerRef, OrderPayload};
pub use product::ProductPayload;

/// Errors raised while reading a webhook body.
#[derive(Debug, Error)]
pub enum PayloadError {
    /// The body is not JSON of the expected shape.
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A field needed to identify the record is absent.
    #[error("missing required field: {0}")]
    MissingField(&'static str),
}

/// Deserialize a payload from the raw request body.
///
/// The body must be a JSON object. Derived structs would otherwise also
/// accept a JSON array, filling fields by position.
pub(crate) fn parse<T: DeserializeOwned>(body: &[u8]) -> Result<T, PayloadError> {
    let object = match serde_json::from_slice::<Value>(body)? {
        Value::Object(map) => map,
        other => {
            return Err(PayloadError::Json(serde_json::Error::custom(format!(
                "expected a JSON object, got {}",
                kind(&other)
            ))));
        }
    };
    Ok(T::deserialize(Value::Object(object))?)
}

const fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Saturating conversion for counts stored as `INTEGER`.
pub(crate) fn count_to_i32(count: usize) -> i32 {
    i32::try_from(count).unwrap_or(i32::MAX)
}
