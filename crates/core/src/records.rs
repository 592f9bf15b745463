//! Simplified projections of Shopify resources.
//!
//! Every record is scoped by [`StoreId`] and identified within that store by
//! the resource's Shopify ID. Records are created by the first `create`
//! webhook and mutated by later ones; nothing here is ever deleted.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{
    CartToken, CurrencyCode, FinancialStatus, FulfillmentStatus, ProductStatus,
    ShopifyCustomerId, ShopifyOrderId, ShopifyProductId, StoreId,
};

/// A stored order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub store_id: StoreId,
    pub shopify_order_id: ShopifyOrderId,
    pub shopify_customer_id: Option<ShopifyCustomerId>,
    pub email: Option<String>,
    pub order_number: i64,
    pub total_price: Decimal,
    pub subtotal_price: Decimal,
    pub total_tax: Decimal,
    pub currency: CurrencyCode,
    pub financial_status: FinancialStatus,
    pub fulfillment_status: FulfillmentStatus,
    pub order_status_url: Option<String>,
    pub cancel_reason: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub processed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A stored customer.
///
/// `total_spent` is an accumulator: after the initial insert it only ever
/// changes by signed deltas, never by overwrite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub store_id: StoreId,
    pub shopify_customer_id: ShopifyCustomerId,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub orders_count: i64,
    pub total_spent: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A stored product. Descriptive fields only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub store_id: StoreId,
    pub shopify_product_id: ShopifyProductId,
    pub title: String,
    pub handle: Option<String>,
    pub vendor: String,
    pub product_type: Option<String>,
    pub status: ProductStatus,
    pub variant_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A stored cart, keyed by its token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartRecord {
    pub store_id: StoreId,
    pub cart_token: CartToken,
    pub shopify_customer_id: Option<ShopifyCustomerId>,
    pub line_item_count: i32,
    pub total_price: Decimal,
    pub currency: CurrencyCode,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
