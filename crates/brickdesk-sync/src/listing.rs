//! Minifig listing actions: staging with the pricing engine, and publishing
//! to eBay behind a claim on the row.

use sqlx::PgPool;
use uuid::Uuid;

use brickdesk_core::{
    calculate_best_offer_thresholds, calculate_recommended_price, evaluate_thresholds,
    ListingStatus, MinifigMarketData, PricingConfig,
};
use brickdesk_db::{MinifigSyncRow, StagedListing};
use brickdesk_marketplaces::ListingPublisher;

use crate::error::SyncError;

/// Prices a minifig from `market` and moves it to `STAGED`.
///
/// Allowed from `NOT_LISTED` or `STAGED` (restaging refreshes the numbers).
/// A blank `ebay_offer_id` keeps the stored one.
///
/// # Errors
///
/// Returns [`SyncError::Db`] with `NotFound` for an unknown item,
/// [`SyncError::Conflict`] if the item is already publishing or published.
pub async fn stage_listing(
    pool: &PgPool,
    user_id: Uuid,
    id: i64,
    market: MinifigMarketData,
    ebay_offer_id: Option<String>,
    pricing: &PricingConfig,
) -> Result<MinifigSyncRow, SyncError> {
    let current = brickdesk_db::get_minifig_item(pool, user_id, id).await?;
    let status = current.listing_status()?;
    if !matches!(status, ListingStatus::NotListed | ListingStatus::Staged) {
        return Err(SyncError::Conflict(format!(
            "minifig {id} is {status} and cannot be restaged"
        )));
    }

    let evaluation = evaluate_thresholds(&market, pricing);
    let recommended_price = calculate_recommended_price(&market, pricing);
    let best_offer = recommended_price.and_then(|p| calculate_best_offer_thresholds(p, pricing));
    if !evaluation.meets_threshold {
        tracing::info!(id, reasons = ?evaluation.reasons, "minifig below listing thresholds");
    }

    let staged = StagedListing {
        market,
        meets_threshold: evaluation.meets_threshold,
        recommended_price,
        best_offer,
        ebay_offer_id: ebay_offer_id.filter(|o| !o.trim().is_empty()),
    };

    match brickdesk_db::stage_minifig_listing(pool, user_id, id, &staged).await {
        Ok(row) => {
            tracing::info!(id, recommended = ?row.recommended_price, "minifig staged");
            Ok(row)
        }
        Err(brickdesk_db::DbError::ListingStateConflict { .. }) => Err(SyncError::Conflict(
            format!("minifig {id} changed status while staging"),
        )),
        Err(e) => Err(e.into()),
    }
}

/// Publishes a staged minifig.
///
/// The row is claimed first by a conditional `STAGED` → `PUBLISHING` update
/// that also requires an eBay offer id and passing thresholds, and eBay is
/// called with the offer id from the claimed row. A restage can no longer
/// change the row once it is claimed. A failed publish puts the row back to
/// `STAGED` with `last_error` set.
///
/// # Errors
///
/// - [`SyncError::Validation`] if the item has no eBay offer id or failed the
///   pricing thresholds.
/// - [`SyncError::Conflict`] if the item is not staged or the claim was lost.
/// - [`SyncError::Marketplace`] if eBay rejects the publish.
pub async fn publish_staged_listing(
    pool: &PgPool,
    publisher: &dyn ListingPublisher,
    user_id: Uuid,
    id: i64,
) -> Result<MinifigSyncRow, SyncError> {
    let Some(claimed) = brickdesk_db::claim_minifig_for_publish(pool, user_id, id).await? else {
        return Err(claim_refused(pool, user_id, id).await);
    };
    let Some(offer_id) = claimed.ebay_offer_id.clone() else {
        release_claim(pool, claimed.id, "claimed row has no eBay offer id").await;
        return Err(missing_offer(id));
    };

    match publisher.publish(&offer_id).await {
        Ok(listing_id) => {
            let row = brickdesk_db::mark_minifig_published(pool, claimed.id, &listing_id).await?;
            tracing::info!(id, listing_id = %listing_id, "minifig published");
            Ok(row)
        }
        Err(e) => {
            let message = e.to_string();
            tracing::warn!(id, error = %message, "eBay publish failed, releasing claim");
            release_claim(pool, claimed.id, &message).await;
            Err(e.into())
        }
    }
}

/// Explains why the claim matched no row, from the row as it is now.
async fn claim_refused(pool: &PgPool, user_id: Uuid, id: i64) -> SyncError {
    let current = match brickdesk_db::get_minifig_item(pool, user_id, id).await {
        Ok(row) => row,
        Err(e) => return e.into(),
    };
    let status = match current.listing_status() {
        Ok(status) => status,
        Err(e) => return e.into(),
    };

    if status != ListingStatus::Staged {
        tracing::warn!(id, %status, "publish claim refused");
        return SyncError::Conflict(format!(
            "minifig {id} is {status}, only STAGED items can be published"
        ));
    }
    if current.ebay_offer_id.as_deref().is_none_or(|o| o.trim().is_empty()) {
        return missing_offer(id);
    }
    if current.meets_threshold == Some(false) {
        return SyncError::Validation {
            field: "meets_threshold",
            reason: format!("minifig {id} does not meet the listing thresholds"),
        };
    }
    // Staged and publishable now, so it changed under the claim.
    SyncError::Conflict(format!("minifig {id} changed while being claimed, retry"))
}

fn missing_offer(id: i64) -> SyncError {
    SyncError::Validation {
        field: "ebay_offer_id",
        reason: format!("minifig {id} has no eBay offer to publish"),
    }
}

async fn release_claim(pool: &PgPool, id: i64, message: &str) {
    if let Err(e) = brickdesk_db::revert_minifig_to_staged(pool, id, message).await {
        tracing::error!(id, error = %e, "failed to release publish claim");
    }
}
