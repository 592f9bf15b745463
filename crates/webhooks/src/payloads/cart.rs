//! `carts/*` payloads.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use shopify_insights_core::{CartRecord, CartToken, CurrencyCode, ShopifyCustomerId, StoreId};

use super::{PayloadError, count_to_i32, lenient, parse};

/// Cart webhook body. Carts are keyed by `token`, falling back to `id`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CartPayload {
    #[serde(deserialize_with = "lenient::external_id")]
    pub id: Option<String>,
    #[serde(deserialize_with = "lenient::external_id")]
    pub token: Option<String>,
    #[serde(deserialize_with = "lenient::external_id")]
    pub customer_id: Option<String>,
    #[serde(deserialize_with = "lenient::count")]
    pub line_items: usize,
    #[serde(deserialize_with = "lenient::amount")]
    pub total_price: Option<Decimal>,
    #[serde(deserialize_with = "lenient::text")]
    pub currency: Option<String>,
    #[serde(deserialize_with = "lenient::timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "lenient::timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl CartPayload {
    /// Parse a cart from the raw body.
    ///
    /// # Errors
    ///
    /// Returns `PayloadError::Json` if the body is not a cart object.
    pub fn from_slice(body: &[u8]) -> Result<Self, PayloadError> {
        parse(body)
    }

    /// The cart token.
    ///
    /// # Errors
    ///
    /// Returns `PayloadError::MissingField` if both `token` and `id` are absent.
    pub fn cart_token(&self) -> Result<CartToken, PayloadError> {
        self.token
            .as_deref()
            .or(self.id.as_deref())
            .map(CartToken::new)
            .ok_or(PayloadError::MissingField("token"))
    }

    /// Map to a stored cart.
    ///
    /// # Errors
    ///
    /// Returns `PayloadError::MissingField` if the cart has no token.
    pub fn to_record(
        &self,
        store_id: &StoreId,
        now: DateTime<Utc>,
    ) -> Result<CartRecord, PayloadError> {
        Ok(CartRecord {
            store_id: store_id.clone(),
            cart_token: self.cart_token()?,
            shopify_customer_id: self.customer_id.as_deref().map(ShopifyCustomerId::new),
            line_item_count: count_to_i32(self.line_items),
            total_price: self.total_price.unwrap_or_default(),
            currency: CurrencyCode::parse_or_default(self.currency.as_deref()),
            created_at: self.created_at.unwrap_or(now),
            updated_at: self.updated_at.unwrap_or(now),
        })
    }
}
