//! `PostgreSQL` adapter for [`RecordStore`].
//!
//! Tables live in the `webhooks` schema. Every table is unique on
//! `(store_id, shopify_*_id)` so redelivered webhooks hit `ON CONFLICT`.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use shopify_insights_core::{
    CartRecord, CartToken, CurrencyCode, CustomerRecord, FinancialStatus, FulfillmentStatus,
    OrderRecord, ProductRecord, ProductStatus, ShopifyCustomerId, ShopifyOrderId,
    ShopifyProductId, StoreId,
};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};

use super::{
    CustomerUpdate, InsertOutcome, OrderCancellation, OrderFulfillment, OrderUpdate,
    OrderUpdateOutcome, RecordStore, StoreError, customer_stub,
};

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

// =============================================================================
// Rows
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    store_id: StoreId,
    shopify_order_id: ShopifyOrderId,
    shopify_customer_id: Option<ShopifyCustomerId>,
    email: Option<String>,
    order_number: i64,
    total_price: Decimal,
    subtotal_price: Decimal,
    total_tax: Decimal,
    currency: String,
    financial_status: String,
    fulfillment_status: String,
    order_status_url: Option<String>,
    cancel_reason: Option<String>,
    cancelled_at: Option<DateTime<Utc>>,
    processed_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for OrderRecord {
    type Error = StoreError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let financial_status = row.financial_status.parse::<FinancialStatus>().map_err(|e| {
            StoreError::DataCorruption(format!("order {}: {e}", row.shopify_order_id))
        })?;
        let fulfillment_status = row
            .fulfillment_status
            .parse::<FulfillmentStatus>()
            .map_err(|e| {
                StoreError::DataCorruption(format!("order {}: {e}", row.shopify_order_id))
            })?;

        Ok(Self {
            store_id: row.store_id,
            shopify_order_id: row.shopify_order_id,
            shopify_customer_id: row.shopify_customer_id,
            email: row.email,
            order_number: row.order_number,
            total_price: row.total_price,
            subtotal_price: row.subtotal_price,
            total_tax: row.total_tax,
            currency: CurrencyCode::parse_or_default(Some(&row.currency)),
            financial_status,
            fulfillment_status,
            order_status_url: row.order_status_url,
            cancel_reason: row.cancel_reason,
            cancelled_at: row.cancelled_at,
            processed_at: row.processed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CustomerRow {
    store_id: StoreId,
    shopify_customer_id: ShopifyCustomerId,
    email: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    phone: Option<String>,
    orders_count: i64,
    total_spent: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CustomerRow> for CustomerRecord {
    fn from(row: CustomerRow) -> Self {
        Self {
            store_id: row.store_id,
            shopify_customer_id: row.shopify_customer_id,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            phone: row.phone,
            orders_count: row.orders_count,
            total_spent: row.total_spent,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    store_id: StoreId,
    shopify_product_id: ShopifyProductId,
    title: String,
    handle: Option<String>,
    vendor: String,
    product_type: Option<String>,
    status: String,
    variant_count: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for ProductRecord {
    type Error = StoreError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let status = row.status.parse::<ProductStatus>().map_err(|e| {
            StoreError::DataCorruption(format!("product {}: {e}", row.shopify_product_id))
        })?;

        Ok(Self {
            store_id: row.store_id,
            shopify_product_id: row.shopify_product_id,
            title: row.title,
            handle: row.handle,
            vendor: row.vendor,
            product_type: row.product_type,
            status,
            variant_count: row.variant_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CartRow {
    store_id: StoreId,
    cart_token: CartToken,
    shopify_customer_id: Option<ShopifyCustomerId>,
    line_item_count: i32,
    total_price: Decimal,
    currency: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CartRow> for CartRecord {
    fn from(row: CartRow) -> Self {
        Self {
            store_id: row.store_id,
            cart_token: row.cart_token,
            shopify_customer_id: row.shopify_customer_id,
            line_item_count: row.line_item_count,
            total_price: row.total_price,
            currency: CurrencyCode::parse_or_default(Some(&row.currency)),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

// =============================================================================
// Store
// =============================================================================

/// [`RecordStore`] backed by a `PostgreSQL` pool.
#[derive(Debug, Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Add `delta` to a customer's accumulator inside `tx`.
async fn add_total_spent(
    tx: &mut Transaction<'_, Postgres>,
    store_id: &StoreId,
    customer_id: &ShopifyCustomerId,
    delta: Decimal,
    at: DateTime<Utc>,
) -> Result<Option<Decimal>, StoreError> {
    let total = sqlx::query_scalar::<_, Decimal>(
        r"
        UPDATE webhooks.shopify_customers
        SET total_spent = total_spent + $3,
            updated_at = $4
        WHERE store_id = $1 AND shopify_customer_id = $2
        RETURNING total_spent
        ",
    )
    .bind(store_id)
    .bind(customer_id)
    .bind(delta)
    .bind(at)
    .fetch_optional(&mut **tx)
    .await?;

    Ok(total)
}

/// Insert `stub` unless the customer already exists.
async fn insert_customer_stub(
    tx: &mut Transaction<'_, Postgres>,
    stub: &CustomerRecord,
) -> Result<(), StoreError> {
    sqlx::query(
        r"
        INSERT INTO webhooks.shopify_customers (
            store_id, shopify_customer_id, email, orders_count, total_spent,
            created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (store_id, shopify_customer_id) DO NOTHING
        ",
    )
    .bind(&stub.store_id)
    .bind(&stub.shopify_customer_id)
    .bind(&stub.email)
    .bind(stub.orders_count)
    .bind(stub.total_spent)
    .bind(stub.created_at)
    .bind(stub.updated_at)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn insert_order(&self, order: &OrderRecord) -> Result<InsertOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r"
            INSERT INTO webhooks.shopify_orders (
                store_id, shopify_order_id, shopify_customer_id, email, order_number,
                total_price, subtotal_price, total_tax, currency,
                financial_status, fulfillment_status, order_status_url,
                cancel_reason, cancelled_at, processed_at, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            ON CONFLICT (store_id, shopify_order_id) DO NOTHING
            ",
        )
        .bind(&order.store_id)
        .bind(&order.shopify_order_id)
        .bind(&order.shopify_customer_id)
        .bind(&order.email)
        .bind(order.order_number)
        .bind(order.total_price)
        .bind(order.subtotal_price)
        .bind(order.total_tax)
        .bind(order.currency.as_str())
        .bind(order.financial_status.as_str())
        .bind(order.fulfillment_status.as_str())
        .bind(&order.order_status_url)
        .bind(&order.cancel_reason)
        .bind(order.cancelled_at)
        .bind(order.processed_at)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if inserted == 0 {
            tx.rollback().await?;
            return Ok(InsertOutcome::Duplicate);
        }

        if let Some(customer_id) = &order.shopify_customer_id {
            let stub = customer_stub(
                &order.store_id,
                customer_id.clone(),
                order.email.clone(),
                order.created_at,
            );
            insert_customer_stub(&mut tx, &stub).await?;
            add_total_spent(
                &mut tx,
                &order.store_id,
                customer_id,
                order.total_price,
                order.updated_at,
            )
            .await?;
        }

        tx.commit().await?;
        Ok(InsertOutcome::Inserted)
    }

    async fn update_order(
        &self,
        update: &OrderUpdate,
    ) -> Result<Option<OrderUpdateOutcome>, StoreError> {
        let mut tx = self.pool.begin().await?;

        // Row lock serialises concurrent updates of the same order.
        let previous = sqlx::query_as::<_, (Decimal, Option<ShopifyCustomerId>, Option<String>)>(
            r"
            SELECT total_price, shopify_customer_id, email
            FROM webhooks.shopify_orders
            WHERE store_id = $1 AND shopify_order_id = $2
            FOR UPDATE
            ",
        )
        .bind(&update.store_id)
        .bind(&update.shopify_order_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((previous_total, stored_customer, email)) = previous else {
            tx.rollback().await?;
            return Ok(None);
        };

        sqlx::query(
            r"
            UPDATE webhooks.shopify_orders
            SET total_price = $3,
                subtotal_price = $4,
                total_tax = $5,
                financial_status = $6,
                fulfillment_status = $7,
                shopify_customer_id = COALESCE($8, shopify_customer_id),
                updated_at = $9
            WHERE store_id = $1 AND shopify_order_id = $2
            ",
        )
        .bind(&update.store_id)
        .bind(&update.shopify_order_id)
        .bind(update.total_price)
        .bind(update.subtotal_price)
        .bind(update.total_tax)
        .bind(update.financial_status.as_str())
        .bind(update.fulfillment_status.as_str())
        .bind(&update.shopify_customer_id)
        .bind(update.updated_at)
        .execute(&mut *tx)
        .await?;

        let customer = update
            .shopify_customer_id
            .clone()
            .or_else(|| stored_customer.clone());
        let delta = update.total_price - previous_total;
        let at = update.updated_at;

        let (previous_customer_id, customer_total_spent) = if customer == stored_customer {
            let total = match &customer {
                Some(customer_id) if !delta.is_zero() => {
                    add_total_spent(&mut tx, &update.store_id, customer_id, delta, at).await?
                }
                _ => None,
            };
            (None, total)
        } else {
            // Ownership changed: move the whole order total between customers.
            if let Some(old_owner) = &stored_customer {
                add_total_spent(&mut tx, &update.store_id, old_owner, -previous_total, at).await?;
            }
            let total = match &customer {
                Some(new_owner) => {
                    let stub = customer_stub(&update.store_id, new_owner.clone(), email, at);
                    insert_customer_stub(&mut tx, &stub).await?;
                    add_total_spent(&mut tx, &update.store_id, new_owner, update.total_price, at)
                        .await?
                }
                None => None,
            };
            (stored_customer, total)
        };

        tx.commit().await?;

        Ok(Some(OrderUpdateOutcome {
            previous_total,
            delta,
            shopify_customer_id: customer,
            previous_customer_id,
            customer_total_spent,
        }))
    }

    async fn mark_order_fulfilled(
        &self,
        fulfillment: &OrderFulfillment,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r"
            UPDATE webhooks.shopify_orders
            SET fulfillment_status = $3,
                updated_at = $4
            WHERE store_id = $1 AND shopify_order_id = $2
            ",
        )
        .bind(&fulfillment.store_id)
        .bind(&fulfillment.shopify_order_id)
        .bind(fulfillment.fulfillment_status.as_str())
        .bind(fulfillment.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_order_cancelled(
        &self,
        cancellation: &OrderCancellation,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r"
            UPDATE webhooks.shopify_orders
            SET financial_status = $3,
                cancel_reason = $4,
                cancelled_at = $5,
                updated_at = $6
            WHERE store_id = $1 AND shopify_order_id = $2
            ",
        )
        .bind(&cancellation.store_id)
        .bind(&cancellation.shopify_order_id)
        .bind(cancellation.financial_status.as_str())
        .bind(&cancellation.cancel_reason)
        .bind(cancellation.cancelled_at)
        .bind(cancellation.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn upsert_customer(
        &self,
        customer: &CustomerRecord,
    ) -> Result<InsertOutcome, StoreError> {
        // `xmax = 0` is true only for a freshly inserted tuple.
        let inserted = sqlx::query_scalar::<_, bool>(
            r"
            INSERT INTO webhooks.shopify_customers (
                store_id, shopify_customer_id, email, first_name, last_name, phone,
                orders_count, total_spent, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (store_id, shopify_customer_id) DO UPDATE SET
                email = EXCLUDED.email,
                first_name = EXCLUDED.first_name,
                last_name = EXCLUDED.last_name,
                phone = EXCLUDED.phone,
                orders_count = EXCLUDED.orders_count,
                updated_at = EXCLUDED.updated_at
            RETURNING (xmax = 0)
            ",
        )
        .bind(&customer.store_id)
        .bind(&customer.shopify_customer_id)
        .bind(&customer.email)
        .bind(&customer.first_name)
        .bind(&customer.last_name)
        .bind(&customer.phone)
        .bind(customer.orders_count)
        .bind(customer.total_spent)
        .bind(customer.created_at)
        .bind(customer.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(if inserted {
            InsertOutcome::Inserted
        } else {
            InsertOutcome::Updated
        })
    }

    async fn update_customer(&self, update: &CustomerUpdate) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r"
            UPDATE webhooks.shopify_customers
            SET email = COALESCE($3, email),
                first_name = COALESCE($4, first_name),
                last_name = COALESCE($5, last_name),
                phone = COALESCE($6, phone),
                orders_count = COALESCE($7, orders_count),
                updated_at = $8
            WHERE store_id = $1 AND shopify_customer_id = $2
            ",
        )
        .bind(&update.store_id)
        .bind(&update.shopify_customer_id)
        .bind(&update.email)
        .bind(&update.first_name)
        .bind(&update.last_name)
        .bind(&update.phone)
        .bind(update.orders_count)
        .bind(update.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn apply_total_spent_delta(
        &self,
        store_id: &StoreId,
        customer_id: &ShopifyCustomerId,
        delta: Decimal,
        at: DateTime<Utc>,
    ) -> Result<Option<Decimal>, StoreError> {
        let mut tx = self.pool.begin().await?;
        let total = add_total_spent(&mut tx, store_id, customer_id, delta, at).await?;
        tx.commit().await?;
        Ok(total)
    }

    async fn upsert_product(&self, product: &ProductRecord) -> Result<InsertOutcome, StoreError> {
        let inserted = sqlx::query_scalar::<_, bool>(
            r"
            INSERT INTO webhooks.shopify_products (
                store_id, shopify_product_id, title, handle, vendor, product_type,
                status, variant_count, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (store_id, shopify_product_id) DO UPDATE SET
                title = EXCLUDED.title,
                handle = EXCLUDED.handle,
                vendor = EXCLUDED.vendor,
                product_type = EXCLUDED.product_type,
                status = EXCLUDED.status,
                variant_count = EXCLUDED.variant_count,
                updated_at = EXCLUDED.updated_at
            RETURNING (xmax = 0)
            ",
        )
        .bind(&product.store_id)
        .bind(&product.shopify_product_id)
        .bind(&product.title)
        .bind(&product.handle)
        .bind(&product.vendor)
        .bind(&product.product_type)
        .bind(product.status.as_str())
        .bind(product.variant_count)
        .bind(product.created_at)
        .bind(product.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(if inserted {
            InsertOutcome::Inserted
        } else {
            InsertOutcome::Updated
        })
    }

    async fn update_product(&self, product: &ProductRecord) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r"
            UPDATE webhooks.shopify_products
            SET title = $3,
                handle = $4,
                vendor = $5,
                product_type = $6,
                status = $7,
                variant_count = $8,
                updated_at = $9
            WHERE store_id = $1 AND shopify_product_id = $2
            ",
        )
        .bind(&product.store_id)
        .bind(&product.shopify_product_id)
        .bind(&product.title)
        .bind(&product.handle)
        .bind(&product.vendor)
        .bind(&product.product_type)
        .bind(product.status.as_str())
        .bind(product.variant_count)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn upsert_cart(&self, cart: &CartRecord) -> Result<InsertOutcome, StoreError> {
        let inserted = sqlx::query_scalar::<_, bool>(
            r"
            INSERT INTO webhooks.shopify_carts (
                store_id, cart_token, shopify_customer_id, line_item_count,
                total_price, currency, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (store_id, cart_token) DO UPDATE SET
                shopify_customer_id = EXCLUDED.shopify_customer_id,
                line_item_count = EXCLUDED.line_item_count,
                total_price = EXCLUDED.total_price,
                currency = EXCLUDED.currency,
                updated_at = EXCLUDED.updated_at
            RETURNING (xmax = 0)
            ",
        )
        .bind(&cart.store_id)
        .bind(&cart.cart_token)
        .bind(&cart.shopify_customer_id)
        .bind(cart.line_item_count)
        .bind(cart.total_price)
        .bind(cart.currency.as_str())
        .bind(cart.created_at)
        .bind(cart.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(if inserted {
            InsertOutcome::Inserted
        } else {
            InsertOutcome::Updated
        })
    }

    async fn update_cart(&self, cart: &CartRecord) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r"
            UPDATE webhooks.shopify_carts
            SET shopify_customer_id = $3,
                line_item_count = $4,
                total_price = $5,
                currency = $6,
                updated_at = $7
            WHERE store_id = $1 AND cart_token = $2
            ",
        )
        .bind(&cart.store_id)
        .bind(&cart.cart_token)
        .bind(&cart.shopify_customer_id)
        .bind(cart.line_item_count)
        .bind(cart.total_price)
        .bind(cart.currency.as_str())
        .bind(cart.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_order(
        &self,
        store_id: &StoreId,
        order_id: &ShopifyOrderId,
    ) -> Result<Option<OrderRecord>, StoreError> {
        let row = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT store_id, shopify_order_id, shopify_customer_id, email, order_number,
                   total_price, subtotal_price, total_tax, currency,
                   financial_status, fulfillment_status, order_status_url,
                   cancel_reason, cancelled_at, processed_at, created_at, updated_at
            FROM webhooks.shopify_orders
            WHERE store_id = $1 AND shopify_order_id = $2
            ",
        )
        .bind(store_id)
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(OrderRecord::try_from).transpose()
    }

    async fn find_customer(
        &self,
        store_id: &StoreId,
        customer_id: &ShopifyCustomerId,
    ) -> Result<Option<CustomerRecord>, StoreError> {
        let row = sqlx::query_as::<_, CustomerRow>(
            r"
            SELECT store_id, shopify_customer_id, email, first_name, last_name, phone,
                   orders_count, total_spent, created_at, updated_at
            FROM webhooks.shopify_customers
            WHERE store_id = $1 AND shopify_customer_id = $2
            ",
        )
        .bind(store_id)
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(CustomerRecord::from))
    }

    async fn find_product(
        &self,
        store_id: &StoreId,
        product_id: &ShopifyProductId,
    ) -> Result<Option<ProductRecord>, StoreError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT store_id, shopify_product_id, title, handle, vendor, product_type,
                   status, variant_count, created_at, updated_at
            FROM webhooks.shopify_products
            WHERE store_id = $1 AND shopify_product_id = $2
            ",
        )
        .bind(store_id)
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ProductRecord::try_from).transpose()
    }

    async fn find_cart(
        &self,
        store_id: &StoreId,
        token: &CartToken,
    ) -> Result<Option<CartRecord>, StoreError> {
        let row = sqlx::query_as::<_, CartRow>(
            r"
            SELECT store_id, cart_token, shopify_customer_id, line_item_count,
                   total_price, currency, created_at, updated_at
            FROM webhooks.shopify_carts
            WHERE store_id = $1 AND cart_token = $2
            ",
        )
        .bind(store_id)
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(CartRecord::from))
    }
}
