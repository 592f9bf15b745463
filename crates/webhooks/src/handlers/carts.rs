//! `carts/create` and `carts/update`.

use tracing::instrument;

use super::{HandlerContext, HandlerError, HandlerOutcome, updated_or_missing};
use crate::payloads::CartPayload;

/// Insert a cart or overwrite its projection.
///
/// # Errors
///
/// Returns `HandlerError` if the payload is malformed or storage fails.
#[instrument(skip_all, fields(cart_token))]
pub async fn create(ctx: HandlerContext<'_>, body: &[u8]) -> Result<HandlerOutcome, HandlerError> {
    let payload = CartPayload::from_slice(body)?;
    let record = payload.to_record(ctx.store_id, ctx.received_at)?;
    tracing::Span::current().record("cart_token", record.cart_token.as_str());

    let outcome = ctx.store.upsert_cart(&record).await?;
    tracing::info!(
        cart_token = %record.cart_token,
        line_items = record.line_item_count,
        total_price = %record.total_price,
        outcome = ?outcome,
        "Cart created"
    );

    Ok(outcome.into())
}

/// Overwrite an existing cart projection.
///
/// # Errors
///
/// Returns `HandlerError` if the payload is malformed or storage fails.
#[instrument(skip_all, fields(cart_token))]
pub async fn update(ctx: HandlerContext<'_>, body: &[u8]) -> Result<HandlerOutcome, HandlerError> {
    let payload = CartPayload::from_slice(body)?;
    let record = payload.to_record(ctx.store_id, ctx.received_at)?;
    tracing::Span::current().record("cart_token", record.cart_token.as_str());

    let found = ctx.store.update_cart(&record).await?;
    if found {
        tracing::info!(
            cart_token = %record.cart_token,
            line_items = record.line_item_count,
            "Cart updated"
        );
    } else {
        tracing::warn!(cart_token = %record.cart_token, "Update for unknown cart");
    }

    Ok(updated_or_missing(found))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use shopify_insights_core::CartToken;

    use super::*;
    use crate::handlers::test_support::Fixture;
    use crate::store::RecordStore;

    #[tokio::test]
    async fn test_cart_lifecycle() {
        let fx = Fixture::new();
        let outcome = create(
            fx.ctx(),
            br#"{"token":"c1","line_items":[{"id":1}],"total_price":"9.99"}"#,
        )
        .await
        .unwrap();
        assert_eq!(outcome, HandlerOutcome::Created);

        let outcome = update(
            fx.ctx(),
            br#"{"token":"c1","line_items":[{"id":1},{"id":2}],"total_price":"19.98","customer_id":5}"#,
        )
        .await
        .unwrap();
        assert_eq!(outcome, HandlerOutcome::Updated);

        let cart = fx
            .store
            .find_cart(&fx.store_id, &CartToken::new("c1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cart.line_item_count, 2);
        assert_eq!(cart.total_price, Decimal::new(1998, 2));
        assert_eq!(cart.shopify_customer_id.unwrap().as_str(), "5");
    }

    #[tokio::test]
    async fn test_update_unknown_cart() {
        let fx = Fixture::new();
        let outcome = update(fx.ctx(), br#"{"token":"nope"}"#).await.unwrap();
        assert_eq!(outcome, HandlerOutcome::NotFound);
    }
}
