//! `products/*` payloads.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use shopify_insights_core::{ProductRecord, ProductStatus, ShopifyProductId, StoreId};

use super::{PayloadError, count_to_i32, lenient, parse};

/// Product webhook body. Variants are only counted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProductPayload {
    #[serde(deserialize_with = "lenient::external_id")]
    pub id: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub title: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub handle: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub vendor: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub product_type: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub status: Option<String>,
    #[serde(deserialize_with = "lenient::count")]
    pub variants: usize,
    #[serde(deserialize_with = "lenient::timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "lenient::timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ProductPayload {
    /// Parse a product from the raw body.
    ///
    /// # Errors
    ///
    /// Returns `PayloadError::Json` if the body is not a product object.
    pub fn from_slice(body: &[u8]) -> Result<Self, PayloadError> {
        parse(body)
    }

    /// The product's external ID.
    ///
    /// # Errors
    ///
    /// Returns `PayloadError::MissingField` if `id` is absent.
    pub fn product_id(&self) -> Result<ShopifyProductId, PayloadError> {
        self.id
            .as_deref()
            .map(ShopifyProductId::new)
            .ok_or(PayloadError::MissingField("id"))
    }

    /// Map to a stored product. Missing title and vendor become empty.
    ///
    /// # Errors
    ///
    /// Returns `PayloadError::MissingField` if `id` is absent.
    pub fn to_record(
        &self,
        store_id: &StoreId,
        now: DateTime<Utc>,
    ) -> Result<ProductRecord, PayloadError> {
        Ok(ProductRecord {
            store_id: store_id.clone(),
            shopify_product_id: self.product_id()?,
            title: self.title.clone().unwrap_or_default(),
            handle: self.handle.clone(),
            vendor: self.vendor.clone().unwrap_or_default(),
            product_type: self.product_type.clone(),
            status: ProductStatus::parse_or_default(self.status.as_deref()),
            variant_count: count_to_i32(self.variants),
            created_at: self.created_at.unwrap_or(now),
            updated_at: self.updated_at.unwrap_or(now),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_product_mapping() {
        let payload = ProductPayload::from_slice(
            br#"{"id":632910392,"title":"IPod Nano","vendor":"Apple","status":"draft","variants":[{"id":1},{"id":2}]}"#,
        )
        .unwrap();
        let record = payload.to_record(&StoreId::default(), Utc::now()).unwrap();

        assert_eq!(record.shopify_product_id.as_str(), "632910392");
        assert_eq!(record.title, "IPod Nano");
        assert_eq!(record.status, ProductStatus::Draft);
        assert_eq!(record.variant_count, 2);
    }

    #[test]
    fn test_missing_descriptive_fields() {
        let payload = ProductPayload::from_slice(br#"{"id":"7","variants":null}"#).unwrap();
        let record = payload.to_record(&StoreId::default(), Utc::now()).unwrap();

        assert_eq!(record.title, "");
        assert_eq!(record.vendor, "");
        assert_eq!(record.status, ProductStatus::Active);
        assert_eq!(record.variant_count, 0);
    }
}
