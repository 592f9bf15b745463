//! `orders/*` payloads.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use shopify_insights_core::{
    CurrencyCode, FinancialStatus, FulfillmentStatus, OrderRecord, ShopifyCustomerId,
    ShopifyOrderId, StoreId,
};

use super::{PayloadError, lenient, parse};
use crate::store::{OrderCancellation, OrderFulfillment, OrderUpdate};

/// Customer reference embedded in an order.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CustomerRef {
    #[serde(deserialize_with = "lenient::external_id")]
    pub id: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub email: Option<String>,
}

/// Order webhook body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OrderPayload {
    #[serde(deserialize_with = "lenient::external_id")]
    pub id: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub email: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient::integer")]
    pub order_number: Option<i64>,
    #[serde(deserialize_with = "lenient::amount")]
    pub total_price: Option<Decimal>,
    #[serde(deserialize_with = "lenient::amount")]
    pub subtotal_price: Option<Decimal>,
    #[serde(deserialize_with = "lenient::amount")]
    pub total_tax: Option<Decimal>,
    #[serde(deserialize_with = "lenient::text")]
    pub currency: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub financial_status: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub fulfillment_status: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub order_status_url: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub cancel_reason: Option<String>,
    #[serde(deserialize_with = "lenient::timestamp")]
    pub cancelled_at: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "lenient::timestamp")]
    pub processed_at: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "lenient::timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "lenient::timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
    pub customer: Option<CustomerRef>,
}

impl OrderPayload {
    /// Parse an order from the raw body.
    ///
    /// # Errors
    ///
    /// Returns `PayloadError::Json` if the body is not an order object.
    pub fn from_slice(body: &[u8]) -> Result<Self, PayloadError> {
        parse(body)
    }

    /// The order's external ID.
    ///
    /// # Errors
    ///
    /// Returns `PayloadError::MissingField` if `id` is absent.
    pub fn order_id(&self) -> Result<ShopifyOrderId, PayloadError> {
        self.id
            .as_deref()
            .map(ShopifyOrderId::new)
            .ok_or(PayloadError::MissingField("id"))
    }

    /// The referenced customer, if any.
    #[must_use]
    pub fn customer_id(&self) -> Option<ShopifyCustomerId> {
        self.customer
            .as_ref()
            .and_then(|c| c.id.as_deref())
            .map(ShopifyCustomerId::new)
    }

    /// `total_price`, zero when absent.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.total_price.unwrap_or_default()
    }

    /// `subtotal_price`, falling back to the total.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.subtotal_price.unwrap_or_else(|| self.total())
    }

    /// `order_number`, falling back to the leading digits of `name` after
    /// its `#` (`#1001-A2` is 1001).
    #[must_use]
    pub fn number(&self) -> i64 {
        self.order_number
            .or_else(|| {
                let name = self.name.as_deref()?.replacen('#', "", 1);
                let digits: String = name
                    .trim_start()
                    .chars()
                    .take_while(char::is_ascii_digit)
                    .collect();
                digits.parse().ok()
            })
            .unwrap_or(0)
    }

    /// Map to a new stored order.
    ///
    /// # Errors
    ///
    /// Returns `PayloadError::MissingField` if `id` is absent.
    pub fn to_record(
        &self,
        store_id: &StoreId,
        now: DateTime<Utc>,
    ) -> Result<OrderRecord, PayloadError> {
        let created_at = self.created_at.unwrap_or(now);
        Ok(OrderRecord {
            store_id: store_id.clone(),
            shopify_order_id: self.order_id()?,
            shopify_customer_id: self.customer_id(),
            email: self
                .email
                .clone()
                .or_else(|| self.customer.as_ref().and_then(|c| c.email.clone())),
            order_number: self.number(),
            total_price: self.total(),
            subtotal_price: self.subtotal(),
            total_tax: self.total_tax.unwrap_or_default(),
            currency: CurrencyCode::parse_or_default(self.currency.as_deref()),
            financial_status: FinancialStatus::parse_or_default(self.financial_status.as_deref()),
            fulfillment_status: FulfillmentStatus::parse_or_default(
                self.fulfillment_status.as_deref(),
            ),
            order_status_url: self.order_status_url.clone(),
            cancel_reason: self.cancel_reason.clone(),
            cancelled_at: self.cancelled_at,
            processed_at: self.processed_at.unwrap_or(now),
            created_at,
            updated_at: self.updated_at.unwrap_or(now),
        })
    }

    /// Map to the field changes of an `orders/updated` event.
    ///
    /// # Errors
    ///
    /// Returns `PayloadError::MissingField` if `id` is absent.
    pub fn to_update(
        &self,
        store_id: &StoreId,
        now: DateTime<Utc>,
    ) -> Result<OrderUpdate, PayloadError> {
        Ok(OrderUpdate {
            store_id: store_id.clone(),
            shopify_order_id: self.order_id()?,
            shopify_customer_id: self.customer_id(),
            total_price: self.total(),
            subtotal_price: self.subtotal(),
            total_tax: self.total_tax.unwrap_or_default(),
            financial_status: FinancialStatus::parse_or_default(self.financial_status.as_deref()),
            fulfillment_status: FulfillmentStatus::parse_or_default(
                self.fulfillment_status.as_deref(),
            ),
            updated_at: self.updated_at.unwrap_or(now),
        })
    }

    /// Map to an `orders/fulfilled` event. A missing status means `fulfilled`.
    ///
    /// # Errors
    ///
    /// Returns `PayloadError::MissingField` if `id` is absent.
    pub fn to_fulfillment(
        &self,
        store_id: &StoreId,
        now: DateTime<Utc>,
    ) -> Result<OrderFulfillment, PayloadError> {
        let fulfillment_status = self
            .fulfillment_status
            .as_deref()
            .and_then(|s| s.parse().ok())
            .unwrap_or(FulfillmentStatus::Fulfilled);

        Ok(OrderFulfillment {
            store_id: store_id.clone(),
            shopify_order_id: self.order_id()?,
            fulfillment_status,
            updated_at: self.updated_at.unwrap_or(now),
        })
    }

    /// Map to an `orders/cancelled` event.
    ///
    /// # Errors
    ///
    /// Returns `PayloadError::MissingField` if `id` is absent.
    pub fn to_cancellation(
        &self,
        store_id: &StoreId,
        now: DateTime<Utc>,
    ) -> Result<OrderCancellation, PayloadError> {
        let updated_at = self.updated_at.unwrap_or(now);
        Ok(OrderCancellation {
            store_id: store_id.clone(),
            shopify_order_id: self.order_id()?,
            financial_status: FinancialStatus::parse_or_default(self.financial_status.as_deref()),
            cancel_reason: self.cancel_reason.clone(),
            cancelled_at: self.cancelled_at.unwrap_or(updated_at),
            updated_at,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-02T03:04:05Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_minimal_order_defaults() {
        let payload =
            OrderPayload::from_slice(br#"{"id":123,"total_price":"50.00","customer":{"id":9}}"#)
                .unwrap();
        let record = payload.to_record(&StoreId::default(), now()).unwrap();

        assert_eq!(record.shopify_order_id.as_str(), "123");
        assert_eq!(record.shopify_customer_id.unwrap().as_str(), "9");
        assert_eq!(record.total_price, Decimal::new(5000, 2));
        assert_eq!(record.subtotal_price, Decimal::new(5000, 2));
        assert_eq!(record.total_tax, Decimal::ZERO);
        assert_eq!(record.currency.as_str(), "USD");
        assert_eq!(record.financial_status, FinancialStatus::Unknown);
        assert_eq!(record.fulfillment_status, FulfillmentStatus::Unfulfilled);
        assert_eq!(record.order_number, 0);
        assert_eq!(record.created_at, now());
        assert_eq!(record.updated_at, now());
    }

    #[test]
    fn test_order_number_from_name() {
        let payload = OrderPayload::from_slice(br##"{"id":"1","name":"#1001"}"##).unwrap();
        assert_eq!(payload.number(), 1001);

        let payload =
            OrderPayload::from_slice(br##"{"id":"1","name":"#1001","order_number":7}"##).unwrap();
        assert_eq!(payload.number(), 7);

        let payload = OrderPayload::from_slice(br##"{"id":"1","name":"#1001-A2"}"##).unwrap();
        assert_eq!(payload.number(), 1001);

        let payload = OrderPayload::from_slice(br#"{"id":"1","name":"draft"}"#).unwrap();
        assert_eq!(payload.number(), 0);
    }

    #[test]
    fn test_processed_at_defaults_to_processing_time() {
        let payload = OrderPayload::from_slice(
            br#"{"id":1,"created_at":"2020-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        let record = payload.to_record(&StoreId::default(), now()).unwrap();

        assert_eq!(record.processed_at, now());
        assert_ne!(record.created_at, now());
    }

    #[test]
    fn test_unparseable_money_is_zero() {
        let payload =
            OrderPayload::from_slice(br#"{"id":1,"total_price":"abc","total_tax":null}"#).unwrap();
        assert_eq!(payload.total(), Decimal::ZERO);
        assert_eq!(payload.subtotal(), Decimal::ZERO);
    }

    #[test]
    fn test_missing_id_is_rejected() {
        let payload = OrderPayload::from_slice(br#"{"total_price":"5.00"}"#).unwrap();
        assert!(matches!(
            payload.to_record(&StoreId::default(), now()),
            Err(PayloadError::MissingField("id"))
        ));
    }

    #[test]
    fn test_non_object_body_is_malformed() {
        assert!(matches!(
            OrderPayload::from_slice(b"not json"),
            Err(PayloadError::Json(_))
        ));
        assert!(matches!(
            OrderPayload::from_slice(b"[1,2]"),
            Err(PayloadError::Json(_))
        ));
    }

    #[test]
    fn test_fulfillment_defaults_to_fulfilled() {
        let payload = OrderPayload::from_slice(br#"{"id":1}"#).unwrap();
        let fulfillment = payload.to_fulfillment(&StoreId::default(), now()).unwrap();
        assert_eq!(fulfillment.fulfillment_status, FulfillmentStatus::Fulfilled);

        let payload =
            OrderPayload::from_slice(br#"{"id":1,"fulfillment_status":"partial"}"#).unwrap();
        let fulfillment = payload.to_fulfillment(&StoreId::default(), now()).unwrap();
        assert_eq!(fulfillment.fulfillment_status, FulfillmentStatus::Partial);
    }

    #[test]
    fn test_cancellation_uses_updated_at_when_cancelled_at_missing() {
        let payload = OrderPayload::from_slice(
            br#"{"id":1,"cancel_reason":"customer","financial_status":"voided","updated_at":"2026-03-01T00:00:00Z"}"#,
        )
        .unwrap();
        let cancellation = payload.to_cancellation(&StoreId::default(), now()).unwrap();

        assert_eq!(cancellation.cancel_reason.as_deref(), Some("customer"));
        assert_eq!(cancellation.financial_status, FinancialStatus::Voided);
        assert_eq!(cancellation.cancelled_at, cancellation.updated_at);
        assert_ne!(cancellation.cancelled_at, now());
    }
}
