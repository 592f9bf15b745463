//! `orders/create`, `orders/updated`, `orders/fulfilled`, `orders/cancelled`.

use tracing::instrument;

use super::{HandlerContext, HandlerError, HandlerOutcome, updated_or_missing};
use crate::payloads::OrderPayload;
use crate::refresh::RefreshEvent;

/// Insert a new order and credit its total to the customer.
///
/// # Errors
///
/// Returns `HandlerError` if the payload is malformed or storage fails.
#[instrument(skip_all, fields(order_id))]
pub async fn create(ctx: HandlerContext<'_>, body: &[u8]) -> Result<HandlerOutcome, HandlerError> {
    let payload = OrderPayload::from_slice(body)?;
    let record = payload.to_record(ctx.store_id, ctx.received_at)?;
    tracing::Span::current().record("order_id", record.shopify_order_id.as_str());

    let outcome = ctx.store.insert_order(&record).await?;
    tracing::info!(
        order_id = %record.shopify_order_id,
        order_number = record.order_number,
        total_price = %record.total_price,
        currency = %record.currency,
        customer_id = ?record.shopify_customer_id.as_ref().map(|c| c.as_str()),
        outcome = ?outcome,
        "Order created"
    );

    Ok(outcome.into())
}

/// Apply an order update, adjust the customer's total by the change, then
/// signal the dashboard.
///
/// # Errors
///
/// Returns `HandlerError` if the payload is malformed or storage fails.
#[instrument(skip_all, fields(order_id))]
pub async fn update(ctx: HandlerContext<'_>, body: &[u8]) -> Result<HandlerOutcome, HandlerError> {
    let payload = OrderPayload::from_slice(body)?;
    let update = payload.to_update(ctx.store_id, ctx.received_at)?;
    tracing::Span::current().record("order_id", update.shopify_order_id.as_str());

    let Some(outcome) = ctx.store.update_order(&update).await? else {
        tracing::warn!(order_id = %update.shopify_order_id, "Order update for unknown order");
        return Ok(HandlerOutcome::NotFound);
    };

    if let Some(previous_owner) = &outcome.previous_customer_id {
        tracing::info!(
            order_id = %update.shopify_order_id,
            from_customer_id = %previous_owner,
            to_customer_id = ?outcome.shopify_customer_id.as_ref().map(|c| c.as_str()),
            previous_total = %outcome.previous_total,
            total_price = %update.total_price,
            "Order moved to another customer"
        );
    } else if let (Some(customer_id), false) =
        (&outcome.shopify_customer_id, outcome.delta.is_zero())
    {
        match outcome.customer_total_spent {
            Some(total_spent) => tracing::info!(
                order_id = %update.shopify_order_id,
                customer_id = %customer_id,
                delta = %outcome.delta,
                total_spent = %total_spent,
                "Customer total adjusted"
            ),
            None => tracing::warn!(
                order_id = %update.shopify_order_id,
                customer_id = %customer_id,
                delta = %outcome.delta,
                "Order total changed for unknown customer"
            ),
        }
    }

    tracing::info!(
        order_id = %update.shopify_order_id,
        previous_total = %outcome.previous_total,
        total_price = %update.total_price,
        financial_status = %update.financial_status,
        fulfillment_status = %update.fulfillment_status,
        "Order updated"
    );

    let event = RefreshEvent::order_updated(
        update.shopify_order_id,
        outcome.shopify_customer_id,
        ctx.received_at,
    );
    ctx.notifier.notify(&event).await;

    Ok(HandlerOutcome::Updated)
}

/// Record an order fulfillment.
///
/// # Errors
///
/// Returns `HandlerError` if the payload is malformed or storage fails.
#[instrument(skip_all, fields(order_id))]
pub async fn fulfilled(
    ctx: HandlerContext<'_>,
    body: &[u8],
) -> Result<HandlerOutcome, HandlerError> {
    let payload = OrderPayload::from_slice(body)?;
    let fulfillment = payload.to_fulfillment(ctx.store_id, ctx.received_at)?;
    tracing::Span::current().record("order_id", fulfillment.shopify_order_id.as_str());

    let found = ctx.store.mark_order_fulfilled(&fulfillment).await?;
    if found {
        tracing::info!(
            order_id = %fulfillment.shopify_order_id,
            fulfillment_status = %fulfillment.fulfillment_status,
            "Order fulfilled"
        );
    } else {
        tracing::warn!(order_id = %fulfillment.shopify_order_id, "Fulfillment for unknown order");
    }

    Ok(updated_or_missing(found))
}

/// Record an order cancellation. The customer's total is left unchanged.
///
/// # Errors
///
/// Returns `HandlerError` if the payload is malformed or storage fails.
#[instrument(skip_all, fields(order_id))]
pub async fn cancelled(
    ctx: HandlerContext<'_>,
    body: &[u8],
) -> Result<HandlerOutcome, HandlerError> {
    let payload = OrderPayload::from_slice(body)?;
    let cancellation = payload.to_cancellation(ctx.store_id, ctx.received_at)?;
    tracing::Span::current().record("order_id", cancellation.shopify_order_id.as_str());

    let found = ctx.store.mark_order_cancelled(&cancellation).await?;
    if found {
        tracing::info!(
            order_id = %cancellation.shopify_order_id,
            cancel_reason = ?cancellation.cancel_reason,
            "Order cancelled"
        );
    } else {
        tracing::warn!(order_id = %cancellation.shopify_order_id, "Cancellation for unknown order");
    }

    Ok(updated_or_missing(found))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use shopify_insights_core::{
        FinancialStatus, FulfillmentStatus, ShopifyCustomerId, ShopifyOrderId,
    };

    use super::*;
    use crate::handlers::test_support::Fixture;
    use crate::payloads::PayloadError;
    use crate::store::RecordStore;

    #[tokio::test]
    async fn test_create_then_update_adjusts_customer() {
        let fx = Fixture::new();
        let outcome = create(
            fx.ctx(),
            br#"{"id":123,"total_price":"50.00","customer":{"id":9}}"#,
        )
        .await
        .unwrap();
        assert_eq!(outcome, HandlerOutcome::Created);

        let outcome = update(
            fx.ctx(),
            br#"{"id":123,"total_price":"75.00","customer":{"id":9}}"#,
        )
        .await
        .unwrap();
        assert_eq!(outcome, HandlerOutcome::Updated);

        let order = fx
            .store
            .find_order(&fx.store_id, &ShopifyOrderId::new("123"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(order.total_price, Decimal::new(7500, 2));

        let customer = fx
            .store
            .find_customer(&fx.store_id, &ShopifyCustomerId::new("9"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(customer.total_spent, Decimal::new(7500, 2));
    }

    #[tokio::test]
    async fn test_create_replay_is_duplicate() {
        let fx = Fixture::new();
        let body = br#"{"id":1,"total_price":"10.00","customer":{"id":2}}"#;
        create(fx.ctx(), body).await.unwrap();
        let outcome = create(fx.ctx(), body).await.unwrap();

        assert_eq!(outcome, HandlerOutcome::Duplicate);
        let customer = fx
            .store
            .find_customer(&fx.store_id, &ShopifyCustomerId::new("2"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(customer.total_spent, Decimal::new(1000, 2));
    }

    #[tokio::test]
    async fn test_update_unknown_order_is_not_found() {
        let fx = Fixture::new();
        let outcome = update(fx.ctx(), br#"{"id":404,"total_price":"1.00"}"#)
            .await
            .unwrap();
        assert_eq!(outcome, HandlerOutcome::NotFound);
        assert_eq!(fx.store.counts().await.orders, 0);
    }

    #[tokio::test]
    async fn test_fulfilled_and_cancelled() {
        let fx = Fixture::new();
        create(fx.ctx(), br#"{"id":5,"total_price":"20.00","financial_status":"paid"}"#)
            .await
            .unwrap();

        let outcome = fulfilled(fx.ctx(), br#"{"id":5}"#).await.unwrap();
        assert_eq!(outcome, HandlerOutcome::Updated);

        let outcome = cancelled(
            fx.ctx(),
            br#"{"id":5,"cancel_reason":"fraud","financial_status":"refunded"}"#,
        )
        .await
        .unwrap();
        assert_eq!(outcome, HandlerOutcome::Updated);

        let order = fx
            .store
            .find_order(&fx.store_id, &ShopifyOrderId::new("5"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(order.fulfillment_status, FulfillmentStatus::Fulfilled);
        assert_eq!(order.financial_status, FinancialStatus::Refunded);
        assert_eq!(order.cancel_reason.as_deref(), Some("fraud"));
        assert!(order.cancelled_at.is_some());

        let outcome = fulfilled(fx.ctx(), br#"{"id":6}"#).await.unwrap();
        assert_eq!(outcome, HandlerOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_malformed_order() {
        let fx = Fixture::new();
        let result = create(fx.ctx(), b"{").await;
        assert!(matches!(result, Err(HandlerError::Payload(PayloadError::Json(_)))));

        let result = create(fx.ctx(), br#"{"total_price":"1.00"}"#).await;
        assert!(matches!(
            result,
            Err(HandlerError::Payload(PayloadError::MissingField("id")))
        ));
    }
}
