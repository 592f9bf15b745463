//! `customers/create` and `customers/updated`.

use tracing::instrument;

use super::{HandlerContext, HandlerError, HandlerOutcome, updated_or_missing};
use crate::payloads::CustomerPayload;

/// Insert a customer or refresh its contact fields.
///
/// # Errors
///
/// Returns `HandlerError` if the payload is malformed or storage fails.
#[instrument(skip_all, fields(customer_id))]
pub async fn create(ctx: HandlerContext<'_>, body: &[u8]) -> Result<HandlerOutcome, HandlerError> {
    let payload = CustomerPayload::from_slice(body)?;
    let record = payload.to_record(ctx.store_id, ctx.received_at)?;
    tracing::Span::current().record("customer_id", record.shopify_customer_id.as_str());

    let outcome = ctx.store.upsert_customer(&record).await?;
    tracing::info!(
        customer_id = %record.shopify_customer_id,
        orders_count = record.orders_count,
        outcome = ?outcome,
        "Customer created"
    );

    Ok(outcome.into())
}

/// Update contact fields of an existing customer.
///
/// # Errors
///
/// Returns `HandlerError` if the payload is malformed or storage fails.
#[instrument(skip_all, fields(customer_id))]
pub async fn update(ctx: HandlerContext<'_>, body: &[u8]) -> Result<HandlerOutcome, HandlerError> {
    let payload = CustomerPayload::from_slice(body)?;
    let update = payload.to_update(ctx.store_id, ctx.received_at)?;
    tracing::Span::current().record("customer_id", update.shopify_customer_id.as_str());

    let found = ctx.store.update_customer(&update).await?;
    if found {
        tracing::info!(customer_id = %update.shopify_customer_id, "Customer updated");
    } else {
        tracing::warn!(customer_id = %update.shopify_customer_id, "Update for unknown customer");
    }

    Ok(updated_or_missing(found))
}
