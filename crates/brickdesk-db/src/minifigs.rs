//! Database operations for `minifig_sync_items`.
//!
//! Publishing uses a compare-and-swap on `listing_status`: the row is claimed
//! by moving it from `STAGED` to `PUBLISHING`, and only the caller whose update
//! touched a row may call eBay.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use brickdesk_core::{BestOfferThresholds, ListingStatus, MinifigInventoryItem, MinifigMarketData};

use crate::DbError;

/// A row from the `minifig_sync_items` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MinifigSyncRow {
    pub id: i64,
    pub user_id: Uuid,
    pub bricqer_item_id: String,
    pub bricklink_id: Option<String>,
    pub name: String,
    pub condition: String,
    pub bricqer_price: Option<Decimal>,
    pub cost: Option<Decimal>,
    pub quantity: i32,
    pub bricklink_avg_sold: Option<Decimal>,
    pub ebay_avg_sold: Option<Decimal>,
    pub ebay_sold_count: i32,
    pub ebay_active_count: i32,
    pub ebay_sell_through_pct: Option<Decimal>,
    pub meets_threshold: Option<bool>,
    pub recommended_price: Option<Decimal>,
    pub best_offer_auto_accept: Option<Decimal>,
    pub best_offer_auto_decline: Option<Decimal>,
    pub ebay_offer_id: Option<String>,
    pub ebay_listing_id: Option<String>,
    pub listing_status: String,
    pub last_error: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MinifigSyncRow {
    /// # Errors
    ///
    /// Returns [`DbError::Corrupt`] if the column holds an unknown value.
    pub fn listing_status(&self) -> Result<ListingStatus, DbError> {
        Ok(self.listing_status.parse()?)
    }

    #[must_use]
    pub fn market_data(&self) -> MinifigMarketData {
        MinifigMarketData {
            bricklink_avg_sold: self.bricklink_avg_sold,
            ebay_avg_sold: self.ebay_avg_sold,
            ebay_sold_count: self.ebay_sold_count,
            ebay_active_count: self.ebay_active_count,
            ebay_sell_through_pct: self.ebay_sell_through_pct,
        }
    }
}

/// Pricing decisions written when a minifig is staged.
#[derive(Debug, Clone)]
pub struct StagedListing {
    pub market: MinifigMarketData,
    pub meets_threshold: bool,
    pub recommended_price: Option<Decimal>,
    pub best_offer: Option<BestOfferThresholds>,
    pub ebay_offer_id: Option<String>,
}

const MINIFIG_COLUMNS: &str = "id, user_id, bricqer_item_id, bricklink_id, name, condition, \
     bricqer_price, cost, quantity, bricklink_avg_sold, ebay_avg_sold, ebay_sold_count, \
     ebay_active_count, ebay_sell_through_pct, meets_threshold, recommended_price, \
     best_offer_auto_accept, best_offer_auto_decline, ebay_offer_id, ebay_listing_id, \
     listing_status, last_error, published_at, created_at, updated_at";

/// Inserts or refreshes a minifig pulled from Bricqer stock.
///
/// Only stock fields are updated on conflict; listing state and pricing
/// decisions are left alone.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_minifig_item(
    pool: &PgPool,
    user_id: Uuid,
    item: &MinifigInventoryItem,
) -> Result<i64, DbError> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO minifig_sync_items \
             (user_id, bricqer_item_id, bricklink_id, name, condition, bricqer_price, cost, quantity) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         ON CONFLICT (user_id, bricqer_item_id) DO UPDATE SET \
             bricklink_id  = EXCLUDED.bricklink_id, \
             name          = EXCLUDED.name, \
             condition     = EXCLUDED.condition, \
             bricqer_price = EXCLUDED.bricqer_price, \
             cost          = COALESCE(EXCLUDED.cost, minifig_sync_items.cost), \
             quantity      = EXCLUDED.quantity, \
             updated_at    = NOW() \
         RETURNING id",
    )
    .bind(user_id)
    .bind(&item.bricqer_item_id)
    .bind(&item.bricklink_id)
    .bind(&item.name)
    .bind(&item.condition)
    .bind(item.bricqer_price)
    .bind(item.cost)
    .bind(item.quantity)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// # Errors
///
/// Returns [`DbError::NotFound`] if the item does not exist for this tenant.
pub async fn get_minifig_item(pool: &PgPool, user_id: Uuid, id: i64) -> Result<MinifigSyncRow, DbError> {
    let sql = format!("SELECT {MINIFIG_COLUMNS} FROM minifig_sync_items WHERE id = $1 AND user_id = $2");
    sqlx::query_as::<_, MinifigSyncRow>(&sql)
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)
}

/// Writes pricing decisions and moves the item to `STAGED`.
///
/// Allowed only from `NOT_LISTED` or `STAGED`.
///
/// # Errors
///
/// Returns [`DbError::ListingStateConflict`] if the item is in any other
/// status, or [`DbError::Sqlx`] if the update fails.
pub async fn stage_minifig_listing(
    pool: &PgPool,
    user_id: Uuid,
    id: i64,
    staged: &StagedListing,
) -> Result<MinifigSyncRow, DbError> {
    let sql = format!(
        "UPDATE minifig_sync_items SET \
             bricklink_avg_sold      = $3, \
             ebay_avg_sold           = $4, \
             ebay_sold_count         = $5, \
             ebay_active_count       = $6, \
             ebay_sell_through_pct   = $7, \
             meets_threshold         = $8, \
             recommended_price       = $9, \
             best_offer_auto_accept  = $10, \
             best_offer_auto_decline = $11, \
             ebay_offer_id           = COALESCE($12, ebay_offer_id), \
             listing_status          = 'STAGED', \
             last_error              = NULL, \
             updated_at              = NOW() \
         WHERE id = $1 AND user_id = $2 AND listing_status IN ('NOT_LISTED', 'STAGED') \
         RETURNING {MINIFIG_COLUMNS}"
    );
    let row = sqlx::query_as::<_, MinifigSyncRow>(&sql)
        .bind(id)
        .bind(user_id)
        .bind(staged.market.bricklink_avg_sold)
        .bind(staged.market.ebay_avg_sold)
        .bind(staged.market.ebay_sold_count)
        .bind(staged.market.ebay_active_count)
        .bind(staged.market.ebay_sell_through_pct)
        .bind(staged.meets_threshold)
        .bind(staged.recommended_price)
        .bind(staged.best_offer.map(|t| t.auto_accept))
        .bind(staged.best_offer.map(|t| t.auto_decline))
        .bind(&staged.ebay_offer_id)
        .fetch_optional(pool)
        .await?;

    row.ok_or(DbError::ListingStateConflict {
        id,
        expected_status: "NOT_LISTED or STAGED",
    })
}

/// Claims a staged item for publishing by moving it `STAGED` → `PUBLISHING`.
/// Only items with an eBay offer id that did not fail the pricing thresholds
/// can be claimed, checked in the same statement.
///
/// Returns `None` when no row was updated: the item is missing, owned by
/// another tenant, not publishable, or another caller already claimed it.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn claim_minifig_for_publish(
    pool: &PgPool,
    user_id: Uuid,
    id: i64,
) -> Result<Option<MinifigSyncRow>, DbError> {
    let sql = format!(
        "UPDATE minifig_sync_items \
         SET listing_status = 'PUBLISHING', updated_at = NOW() \
         WHERE id = $1 AND user_id = $2 AND listing_status = 'STAGED' \
           AND btrim(COALESCE(ebay_offer_id, '')) <> '' \
           AND meets_threshold IS DISTINCT FROM FALSE \
         RETURNING {MINIFIG_COLUMNS}"
    );
    let row = sqlx::query_as::<_, MinifigSyncRow>(&sql)
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

/// Completes a claimed publish.
///
/// # Errors
///
/// Returns [`DbError::ListingStateConflict`] if the item is not `PUBLISHING`.
pub async fn mark_minifig_published(
    pool: &PgPool,
    id: i64,
    ebay_listing_id: &str,
) -> Result<MinifigSyncRow, DbError> {
    let sql = format!(
        "UPDATE minifig_sync_items SET \
             listing_status  = 'PUBLISHED', \
             ebay_listing_id = $2, \
             published_at    = NOW(), \
             last_error      = NULL, \
             updated_at      = NOW() \
         WHERE id = $1 AND listing_status = 'PUBLISHING' \
         RETURNING {MINIFIG_COLUMNS}"
    );
    sqlx::query_as::<_, MinifigSyncRow>(&sql)
        .bind(id)
        .bind(ebay_listing_id)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::ListingStateConflict {
            id,
            expected_status: "PUBLISHING",
        })
}

/// Releases a claim after a failed publish so the item can be retried.
///
/// # Errors
///
/// Returns [`DbError::ListingStateConflict`] if the item is not `PUBLISHING`.
pub async fn revert_minifig_to_staged(
    pool: &PgPool,
    id: i64,
    error_message: &str,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE minifig_sync_items \
         SET listing_status = 'STAGED', last_error = $2, updated_at = NOW() \
         WHERE id = $1 AND listing_status = 'PUBLISHING'",
    )
    .bind(id)
    .bind(error_message)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::ListingStateConflict {
            id,
            expected_status: "PUBLISHING",
        });
    }
    Ok(())
}
