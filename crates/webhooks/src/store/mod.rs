//! Persistence port for webhook projections.
//!
//! Handlers talk to storage only through [`RecordStore`]. Two adapters are
//! provided:
//!
//! - [`PgRecordStore`] - `PostgreSQL` via sqlx (schema `webhooks`)
//! - [`MemoryRecordStore`] - in-process maps with identical semantics
//!
//! # Atomicity
//!
//! The customer `total_spent` accumulator is only changed through signed
//! deltas applied inside the store. [`RecordStore::update_order`] captures the
//! previously stored order total, writes the new one and applies the
//! difference to the customer as one atomic unit, so concurrent order updates
//! for the same customer never lose a delta.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/webhooks/migrations/` and run via:
//! ```bash
//! cargo run -p shopify-insights-cli -- migrate
//! ```

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use shopify_insights_core::{
    CartRecord, CartToken, CustomerRecord, FinancialStatus, FulfillmentStatus, OrderRecord,
    ProductRecord, ShopifyCustomerId, ShopifyOrderId, ShopifyProductId, StoreId,
};
use thiserror::Error;

pub use memory::{MemoryRecordStore, TableCounts};
pub use postgres::{PgRecordStore, create_pool};

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// The store refused the operation (used by test doubles and health checks).
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// What an insert-or-update did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new row was created.
    Inserted,
    /// An existing row was refreshed in place.
    Updated,
    /// An existing row was left untouched.
    Duplicate,
}

/// Field-level changes carried by an `orders/updated` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderUpdate {
    pub store_id: StoreId,
    pub shopify_order_id: ShopifyOrderId,
    pub shopify_customer_id: Option<ShopifyCustomerId>,
    pub total_price: Decimal,
    pub subtotal_price: Decimal,
    pub total_tax: Decimal,
    pub financial_status: FinancialStatus,
    pub fulfillment_status: FulfillmentStatus,
    pub updated_at: DateTime<Utc>,
}

/// Result of applying an [`OrderUpdate`] to a stored order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderUpdateOutcome {
    /// Total stored before this update.
    pub previous_total: Decimal,
    /// `total_price - previous_total`.
    pub delta: Decimal,
    /// Customer that owns the order after this update, if any.
    pub shopify_customer_id: Option<ShopifyCustomerId>,
    /// Previous owner, set only when the update moved the order to another
    /// customer. It was debited the previous total.
    pub previous_customer_id: Option<ShopifyCustomerId>,
    /// Owner's accumulated total after the change, when one was applied.
    pub customer_total_spent: Option<Decimal>,
}

/// An `orders/fulfilled` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderFulfillment {
    pub store_id: StoreId,
    pub shopify_order_id: ShopifyOrderId,
    pub fulfillment_status: FulfillmentStatus,
    pub updated_at: DateTime<Utc>,
}

/// An `orders/cancelled` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderCancellation {
    pub store_id: StoreId,
    pub shopify_order_id: ShopifyOrderId,
    pub financial_status: FinancialStatus,
    pub cancel_reason: Option<String>,
    pub cancelled_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Contact changes carried by a `customers/updated` event.
///
/// Has no `total_spent`: the accumulator is never overwritten. `None` fields
/// keep the stored value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerUpdate {
    pub store_id: StoreId,
    pub shopify_customer_id: ShopifyCustomerId,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub orders_count: Option<i64>,
    pub updated_at: DateTime<Utc>,
}

/// Storage port used by the webhook handlers.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Check that the store is reachable.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Insert an order keyed by `(store_id, shopify_order_id)`.
    ///
    /// A redelivered order is a [`InsertOutcome::Duplicate`] no-op. On first
    /// insert the order total is credited to the referenced customer, creating
    /// a customer row if none exists yet.
    async fn insert_order(&self, order: &OrderRecord) -> Result<InsertOutcome, StoreError>;

    /// Apply an order update and the matching customer adjustment atomically.
    ///
    /// When the owner is unchanged it is adjusted by `total_price - previous_total`.
    /// When the update attaches or moves the order to another customer, the
    /// previous owner is debited the previous total and the new owner (created
    /// as a stub if absent) is credited the new total, so every customer's
    /// `total_spent` stays the sum of the orders it owns.
    ///
    /// Returns `None` when no order matches.
    async fn update_order(
        &self,
        update: &OrderUpdate,
    ) -> Result<Option<OrderUpdateOutcome>, StoreError>;

    /// Record a fulfillment. Returns `false` when no order matches.
    async fn mark_order_fulfilled(&self, fulfillment: &OrderFulfillment)
    -> Result<bool, StoreError>;

    /// Record a cancellation. Returns `false` when no order matches.
    async fn mark_order_cancelled(
        &self,
        cancellation: &OrderCancellation,
    ) -> Result<bool, StoreError>;

    /// Insert a customer, or refresh contact fields of an existing one.
    ///
    /// `total_spent` is only written on insert.
    async fn upsert_customer(&self, customer: &CustomerRecord)
    -> Result<InsertOutcome, StoreError>;

    /// Update the contact fields present in `update`. Returns `false` when no
    /// customer matches.
    async fn update_customer(&self, update: &CustomerUpdate) -> Result<bool, StoreError>;

    /// Add a signed delta to a customer's `total_spent` in one atomic step.
    ///
    /// Returns the new total, or `None` when no customer matches.
    async fn apply_total_spent_delta(
        &self,
        store_id: &StoreId,
        customer_id: &ShopifyCustomerId,
        delta: Decimal,
        at: DateTime<Utc>,
    ) -> Result<Option<Decimal>, StoreError>;

    /// Insert a product or overwrite its descriptive fields.
    async fn upsert_product(&self, product: &ProductRecord) -> Result<InsertOutcome, StoreError>;

    /// Overwrite descriptive fields. Returns `false` when no product matches.
    async fn update_product(&self, product: &ProductRecord) -> Result<bool, StoreError>;

    /// Insert a cart or overwrite its projection.
    async fn upsert_cart(&self, cart: &CartRecord) -> Result<InsertOutcome, StoreError>;

    /// Overwrite a cart projection. Returns `false` when no cart matches.
    async fn update_cart(&self, cart: &CartRecord) -> Result<bool, StoreError>;

    async fn find_order(
        &self,
        store_id: &StoreId,
        order_id: &ShopifyOrderId,
    ) -> Result<Option<OrderRecord>, StoreError>;

    async fn find_customer(
        &self,
        store_id: &StoreId,
        customer_id: &ShopifyCustomerId,
    ) -> Result<Option<CustomerRecord>, StoreError>;

    async fn find_product(
        &self,
        store_id: &StoreId,
        product_id: &ShopifyProductId,
    ) -> Result<Option<ProductRecord>, StoreError>;

    async fn find_cart(
        &self,
        store_id: &StoreId,
        token: &CartToken,
    ) -> Result<Option<CartRecord>, StoreError>;
}

/// Minimal customer row created when an order references an unknown customer.
pub(crate) fn customer_stub(
    store_id: &StoreId,
    customer_id: ShopifyCustomerId,
    email: Option<String>,
    at: DateTime<Utc>,
) -> CustomerRecord {
    CustomerRecord {
        store_id: store_id.clone(),
        shopify_customer_id: customer_id,
        email,
        first_name: None,
        last_name: None,
        phone: None,
        orders_count: 0,
        total_spent: Decimal::ZERO,
        created_at: at,
        updated_at: at,
    }
}
