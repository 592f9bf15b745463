//! In-memory [`RecordStore`] used by tests and database-less local runs.
//!
//! All tables sit behind a single async mutex, so every trait method is one
//! atomic step exactly like its transactional `PostgreSQL` counterpart.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use shopify_insights_core::{
    CartRecord, CartToken, CustomerRecord, OrderRecord, ProductRecord, ShopifyCustomerId,
    ShopifyOrderId, ShopifyProductId, StoreId,
};
use tokio::sync::Mutex;

use super::{
    CustomerUpdate, InsertOutcome, OrderCancellation, OrderFulfillment, OrderUpdate,
    OrderUpdateOutcome, RecordStore, StoreError, customer_stub,
};

#[derive(Debug, Default)]
struct Tables {
    orders: HashMap<(StoreId, ShopifyOrderId), OrderRecord>,
    customers: HashMap<(StoreId, ShopifyCustomerId), CustomerRecord>,
    products: HashMap<(StoreId, ShopifyProductId), ProductRecord>,
    carts: HashMap<(StoreId, CartToken), CartRecord>,
}

impl Tables {
    fn add_total_spent(
        &mut self,
        store_id: &StoreId,
        customer_id: &ShopifyCustomerId,
        delta: Decimal,
        at: DateTime<Utc>,
    ) -> Option<Decimal> {
        let customer = self
            .customers
            .get_mut(&(store_id.clone(), customer_id.clone()))?;
        customer.total_spent += delta;
        customer.updated_at = at;
        Some(customer.total_spent)
    }
}

fn merge(stored: &mut Option<String>, incoming: Option<&str>) {
    if let Some(value) = incoming {
        *stored = Some(value.to_owned());
    }
}

/// Row counts per table, for asserting that a request stored nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TableCounts {
    pub orders: usize,
    pub customers: usize,
    pub products: usize,
    pub carts: usize,
}

/// Thread-safe in-memory record store.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    tables: Mutex<Tables>,
    unavailable: AtomicBool,
}

impl MemoryRecordStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent operation fail with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Current number of rows in each table.
    pub async fn counts(&self) -> TableCounts {
        let tables = self.tables.lock().await;
        TableCounts {
            orders: tables.orders.len(),
            customers: tables.customers.len(),
            products: tables.products.len(),
            carts: tables.carts.len(),
        }
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store disabled".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.check_available()
    }

    async fn insert_order(&self, order: &OrderRecord) -> Result<InsertOutcome, StoreError> {
        self.check_available()?;
        let mut tables = self.tables.lock().await;

        let key = (order.store_id.clone(), order.shopify_order_id.clone());
        if tables.orders.contains_key(&key) {
            return Ok(InsertOutcome::Duplicate);
        }
        tables.orders.insert(key, order.clone());

        if let Some(customer_id) = &order.shopify_customer_id {
            tables
                .customers
                .entry((order.store_id.clone(), customer_id.clone()))
                .or_insert_with(|| {
                    customer_stub(
                        &order.store_id,
                        customer_id.clone(),
                        order.email.clone(),
                        order.created_at,
                    )
                });
            tables.add_total_spent(
                &order.store_id,
                customer_id,
                order.total_price,
                order.updated_at,
            );
        }

        Ok(InsertOutcome::Inserted)
    }

    async fn update_order(
        &self,
        update: &OrderUpdate,
    ) -> Result<Option<OrderUpdateOutcome>, StoreError> {
        self.check_available()?;
        let mut tables = self.tables.lock().await;

        let key = (update.store_id.clone(), update.shopify_order_id.clone());
        let Some(order) = tables.orders.get_mut(&key) else {
            return Ok(None);
        };

        let previous_total = order.total_price;
        let stored_customer = order.shopify_customer_id.clone();
        order.total_price = update.total_price;
        order.subtotal_price = update.subtotal_price;
        order.total_tax = update.total_tax;
        order.financial_status = update.financial_status;
        order.fulfillment_status = update.fulfillment_status;
        order.updated_at = update.updated_at;
        if update.shopify_customer_id.is_some() {
            order.shopify_customer_id.clone_from(&update.shopify_customer_id);
        }
        let customer = order.shopify_customer_id.clone();
        let email = order.email.clone();

        let delta = update.total_price - previous_total;
        let at = update.updated_at;

        if customer == stored_customer {
            let customer_total_spent = match &customer {
                Some(customer_id) if !delta.is_zero() => {
                    tables.add_total_spent(&update.store_id, customer_id, delta, at)
                }
                _ => None,
            };
            return Ok(Some(OrderUpdateOutcome {
                previous_total,
                delta,
                shopify_customer_id: customer,
                previous_customer_id: None,
                customer_total_spent,
            }));
        }

        // Ownership changed: move the whole order total between customers.
        if let Some(old_owner) = &stored_customer {
            tables.add_total_spent(&update.store_id, old_owner, -previous_total, at);
        }
        let customer_total_spent = customer.as_ref().and_then(|new_owner| {
            tables
                .customers
                .entry((update.store_id.clone(), new_owner.clone()))
                .or_insert_with(|| customer_stub(&update.store_id, new_owner.clone(), email, at));
            tables.add_total_spent(&update.store_id, new_owner, update.total_price, at)
        });

        Ok(Some(OrderUpdateOutcome {
            previous_total,
            delta,
            shopify_customer_id: customer,
            previous_customer_id: stored_customer,
            customer_total_spent,
        }))
    }

    async fn mark_order_fulfilled(
        &self,
        fulfillment: &OrderFulfillment,
    ) -> Result<bool, StoreError> {
        self.check_available()?;
        let mut tables = self.tables.lock().await;
        let key = (
            fulfillment.store_id.clone(),
            fulfillment.shopify_order_id.clone(),
        );
        Ok(tables.orders.get_mut(&key).is_some_and(|order| {
            order.fulfillment_status = fulfillment.fulfillment_status;
            order.updated_at = fulfillment.updated_at;
            true
        }))
    }

    async fn mark_order_cancelled(
        &self,
        cancellation: &OrderCancellation,
    ) -> Result<bool, StoreError> {
        self.check_available()?;
        let mut tables = self.tables.lock().await;
        let key = (
            cancellation.store_id.clone(),
            cancellation.shopify_order_id.clone(),
        );
        Ok(tables.orders.get_mut(&key).is_some_and(|order| {
            order.financial_status = cancellation.financial_status;
            order.cancel_reason.clone_from(&cancellation.cancel_reason);
            order.cancelled_at = Some(cancellation.cancelled_at);
            order.updated_at = cancellation.updated_at;
            true
        }))
    }

    async fn upsert_customer(
        &self,
        customer: &CustomerRecord,
    ) -> Result<InsertOutcome, StoreError> {
        self.check_available()?;
        let mut tables = self.tables.lock().await;
        let key = (
            customer.store_id.clone(),
            customer.shopify_customer_id.clone(),
        );

        if let Some(existing) = tables.customers.get_mut(&key) {
            existing.email.clone_from(&customer.email);
            existing.first_name.clone_from(&customer.first_name);
            existing.last_name.clone_from(&customer.last_name);
            existing.phone.clone_from(&customer.phone);
            existing.orders_count = customer.orders_count;
            existing.updated_at = customer.updated_at;
            return Ok(InsertOutcome::Updated);
        }

        tables.customers.insert(key, customer.clone());
        Ok(InsertOutcome::Inserted)
    }

    async fn update_customer(&self, update: &CustomerUpdate) -> Result<bool, StoreError> {
        self.check_available()?;
        let mut tables = self.tables.lock().await;
        let key = (update.store_id.clone(), update.shopify_customer_id.clone());
        Ok(tables.customers.get_mut(&key).is_some_and(|customer| {
            merge(&mut customer.email, update.email.as_deref());
            merge(&mut customer.first_name, update.first_name.as_deref());
            merge(&mut customer.last_name, update.last_name.as_deref());
            merge(&mut customer.phone, update.phone.as_deref());
            if let Some(orders_count) = update.orders_count {
                customer.orders_count = orders_count;
            }
            customer.updated_at = update.updated_at;
            true
        }))
    }

    async fn apply_total_spent_delta(
        &self,
        store_id: &StoreId,
        customer_id: &ShopifyCustomerId,
        delta: Decimal,
        at: DateTime<Utc>,
    ) -> Result<Option<Decimal>, StoreError> {
        self.check_available()?;
        let mut tables = self.tables.lock().await;
        Ok(tables.add_total_spent(store_id, customer_id, delta, at))
    }

    async fn upsert_product(&self, product: &ProductRecord) -> Result<InsertOutcome, StoreError> {
        self.check_available()?;
        let mut tables = self.tables.lock().await;
        let key = (
            product.store_id.clone(),
            product.shopify_product_id.clone(),
        );

        if let Some(existing) = tables.products.get_mut(&key) {
            let created_at = existing.created_at;
            *existing = product.clone();
            existing.created_at = created_at;
            return Ok(InsertOutcome::Updated);
        }

        tables.products.insert(key, product.clone());
        Ok(InsertOutcome::Inserted)
    }

    async fn update_product(&self, product: &ProductRecord) -> Result<bool, StoreError> {
        self.check_available()?;
        let mut tables = self.tables.lock().await;
        let key = (
            product.store_id.clone(),
            product.shopify_product_id.clone(),
        );
        Ok(tables.products.get_mut(&key).is_some_and(|existing| {
            let created_at = existing.created_at;
            *existing = product.clone();
            existing.created_at = created_at;
            true
        }))
    }

    async fn upsert_cart(&self, cart: &CartRecord) -> Result<InsertOutcome, StoreError> {
        self.check_available()?;
        let mut tables = self.tables.lock().await;
        let key = (cart.store_id.clone(), cart.cart_token.clone());

        if let Some(existing) = tables.carts.get_mut(&key) {
            let created_at = existing.created_at;
            *existing = cart.clone();
            existing.created_at = created_at;
            return Ok(InsertOutcome::Updated);
        }

        tables.carts.insert(key, cart.clone());
        Ok(InsertOutcome::Inserted)
    }

    async fn update_cart(&self, cart: &CartRecord) -> Result<bool, StoreError> {
        self.check_available()?;
        let mut tables = self.tables.lock().await;
        let key = (cart.store_id.clone(), cart.cart_token.clone());
        Ok(tables.carts.get_mut(&key).is_some_and(|existing| {
            let created_at = existing.created_at;
            *existing = cart.clone();
            existing.created_at = created_at;
            true
        }))
    }

    async fn find_order(
        &self,
        store_id: &StoreId,
        order_id: &ShopifyOrderId,
    ) -> Result<Option<OrderRecord>, StoreError> {
        self.check_available()?;
        let tables = self.tables.lock().await;
        Ok(tables
            .orders
            .get(&(store_id.clone(), order_id.clone()))
            .cloned())
    }

    async fn find_customer(
        &self,
        store_id: &StoreId,
        customer_id: &ShopifyCustomerId,
    ) -> Result<Option<CustomerRecord>, StoreError> {
        self.check_available()?;
        let tables = self.tables.lock().await;
        Ok(tables
            .customers
            .get(&(store_id.clone(), customer_id.clone()))
            .cloned())
    }

    async fn find_product(
        &self,
        store_id: &StoreId,
        product_id: &ShopifyProductId,
    ) -> Result<Option<ProductRecord>, StoreError> {
        self.check_available()?;
        let tables = self.tables.lock().await;
        Ok(tables
            .products
            .get(&(store_id.clone(), product_id.clone()))
            .cloned())
    }

    async fn find_cart(
        &self,
        store_id: &StoreId,
        token: &CartToken,
    ) -> Result<Option<CartRecord>, StoreError> {
        self.check_available()?;
        let tables = self.tables.lock().await;
        Ok(tables
            .carts
            .get(&(store_id.clone(), token.clone()))
            .cloned())
    }
}
