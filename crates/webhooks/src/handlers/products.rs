//! `products/create` and `products/update`.

use tracing::instrument;

use super::{HandlerContext, HandlerError, HandlerOutcome, updated_or_missing};
use crate::payloads::ProductPayload;

/// Insert a product or overwrite its descriptive fields.
///
/// # Errors
///
/// Returns `HandlerError` if the payload is malformed or storage fails.
#[instrument(skip_all, fields(product_id))]
pub async fn create(ctx: HandlerContext<'_>, body: &[u8]) -> Result<HandlerOutcome, HandlerError> {
    let payload = ProductPayload::from_slice(body)?;
    let record = payload.to_record(ctx.store_id, ctx.received_at)?;
    tracing::Span::current().record("product_id", record.shopify_product_id.as_str());

    let outcome = ctx.store.upsert_product(&record).await?;
    tracing::info!(
        product_id = %record.shopify_product_id,
        title = %record.title,
        variants = record.variant_count,
        outcome = ?outcome,
        "Product created"
    );

    Ok(outcome.into())
}

/// Overwrite descriptive fields of an existing product.
///
/// # Errors
///
/// Returns `HandlerError` if the payload is malformed or storage fails.
#[instrument(skip_all, fields(product_id))]
pub async fn update(ctx: HandlerContext<'_>, body: &[u8]) -> Result<HandlerOutcome, HandlerError> {
    let payload = ProductPayload::from_slice(body)?;
    let record = payload.to_record(ctx.store_id, ctx.received_at)?;
    tracing::Span::current().record("product_id", record.shopify_product_id.as_str());

    let found = ctx.store.update_product(&record).await?;
    if found {
        tracing::info!(product_id = %record.shopify_product_id, status = %record.status, "Product updated");
    } else {
        tracing::warn!(product_id = %record.shopify_product_id, "Update for unknown product");
    }

    Ok(updated_or_missing(found))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use shopify_insights_core::ShopifyProductId;

    use super::*;
    use crate::handlers::test_support::Fixture;
    use crate::store::RecordStore;

    #[tokio::test]
    async fn test_create_replay_overwrites_single_row() {
        let fx = Fixture::new();
        create(fx.ctx(), br#"{"id":42,"title":"Old"}"#).await.unwrap();
        let outcome = create(fx.ctx(), br#"{"id":42,"title":"New"}"#).await.unwrap();

        assert_eq!(outcome, HandlerOutcome::Updated);
        assert_eq!(fx.store.counts().await.products, 1);
        let product = fx
            .store
            .find_product(&fx.store_id, &ShopifyProductId::new("42"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(product.title, "New");
    }

    #[tokio::test]
    async fn test_update_keeps_created_at() {
        let fx = Fixture::new();
        create(
            fx.ctx(),
            br#"{"id":42,"title":"Tee","created_at":"2026-01-01T00:00:00Z"}"#,
        )
        .await
        .unwrap();
        let outcome = update(fx.ctx(), br#"{"id":42,"title":"Tee v2","status":"archived"}"#)
            .await
            .unwrap();
        assert_eq!(outcome, HandlerOutcome::Updated);

        let product = fx
            .store
            .find_product(&fx.store_id, &ShopifyProductId::new("42"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(product.title, "Tee v2");
        assert_eq!(product.created_at.to_rfc3339(), "2026-01-01T00:00:00+00:00");

        let outcome = update(fx.ctx(), br#"{"id":43}"#).await.unwrap();
        assert_eq!(outcome, HandlerOutcome::NotFound);
    }
}
