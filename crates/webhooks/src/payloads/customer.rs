//! `customers/*` payloads.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use shopify_insights_core::{CustomerRecord, ShopifyCustomerId, StoreId};

use super::{PayloadError, lenient, parse};
use crate::store::CustomerUpdate;

/// Customer webhook body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CustomerPayload {
    #[serde(deserialize_with = "lenient::external_id")]
    pub id: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub email: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub first_name: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub last_name: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub phone: Option<String>,
    #[serde(deserialize_with = "lenient::integer")]
    pub orders_count: Option<i64>,
    #[serde(deserialize_with = "lenient::amount")]
    pub total_spent: Option<Decimal>,
    #[serde(deserialize_with = "lenient::timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "lenient::timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl CustomerPayload {
    /// Parse a customer from the raw body.
    ///
    /// # Errors
    ///
    /// Returns `PayloadError::Json` if the body is not a customer object.
    pub fn from_slice(body: &[u8]) -> Result<Self, PayloadError> {
        parse(body)
    }

    /// The customer's external ID.
    ///
    /// # Errors
    ///
    /// Returns `PayloadError::MissingField` if `id` is absent.
    pub fn customer_id(&self) -> Result<ShopifyCustomerId, PayloadError> {
        self.id
            .as_deref()
            .map(ShopifyCustomerId::new)
            .ok_or(PayloadError::MissingField("id"))
    }

    /// Map to a new stored customer.
    ///
    /// The reported `total_spent` only seeds the accumulator of a new row.
    ///
    /// # Errors
    ///
    /// Returns `PayloadError::MissingField` if `id` is absent.
    pub fn to_record(
        &self,
        store_id: &StoreId,
        now: DateTime<Utc>,
    ) -> Result<CustomerRecord, PayloadError> {
        Ok(CustomerRecord {
            store_id: store_id.clone(),
            shopify_customer_id: self.customer_id()?,
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            phone: self.phone.clone(),
            orders_count: self.orders_count.unwrap_or(0),
            total_spent: self.total_spent.unwrap_or_default(),
            created_at: self.created_at.unwrap_or(now),
            updated_at: self.updated_at.unwrap_or(now),
        })
    }

    /// Map to contact field changes.
    ///
    /// # Errors
    ///
    /// Returns `PayloadError::MissingField` if `id` is absent.
    pub fn to_update(
        &self,
        store_id: &StoreId,
        now: DateTime<Utc>,
    ) -> Result<CustomerUpdate, PayloadError> {
        Ok(CustomerUpdate {
            store_id: store_id.clone(),
            shopify_customer_id: self.customer_id()?,
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            phone: self.phone.clone(),
            orders_count: self.orders_count,
            updated_at: self.updated_at.unwrap_or(now),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_customer_mapping() {
        let payload = CustomerPayload::from_slice(
            br#"{"id":"9","email":"a@example.com","first_name":"Ada","orders_count":"3","total_spent":"12.50"}"#,
        )
        .unwrap();
        let now = Utc::now();
        let record = payload.to_record(&StoreId::default(), now).unwrap();

        assert_eq!(record.shopify_customer_id.as_str(), "9");
        assert_eq!(record.email.as_deref(), Some("a@example.com"));
        assert_eq!(record.last_name, None);
        assert_eq!(record.orders_count, 3);
        assert_eq!(record.total_spent, Decimal::new(1250, 2));
        assert_eq!(record.created_at, now);
    }

    #[test]
    fn test_update_has_no_accumulator() {
        let payload = CustomerPayload::from_slice(br#"{"id":9,"phone":"+15550100"}"#).unwrap();
        let update = payload.to_update(&StoreId::default(), Utc::now()).unwrap();
        assert_eq!(update.phone.as_deref(), Some("+15550100"));
        assert_eq!(update.orders_count, None);
        assert_eq!(update.email, None);
    }

    #[test]
    fn test_missing_id() {
        let payload = CustomerPayload::from_slice(br#"{"id":null}"#).unwrap();
        assert!(matches!(
            payload.customer_id(),
            Err(PayloadError::MissingField("id"))
        ));
    }
}
