//! Database operations for `amazon_sync_queue`.

use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `amazon_sync_queue` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AmazonQueueRow {
    pub id: i64,
    pub user_id: Uuid,
    pub inventory_item_id: Option<i64>,
    pub sku: String,
    pub asin: Option<String>,
    pub price: Option<Decimal>,
    pub quantity: Option<i32>,
    pub status: String,
    pub outcome: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub claimed_at: Option<DateTime<Utc>>,
    pub processed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewAmazonQueueEntry {
    pub inventory_item_id: Option<i64>,
    pub sku: String,
    pub asin: Option<String>,
    pub price: Option<Decimal>,
    pub quantity: Option<i32>,
}

const QUEUE_COLUMNS: &str = "id, user_id, inventory_item_id, sku, asin, price, quantity, \
     status, outcome, error_message, created_at, claimed_at, processed_at";

/// Queues a price and/or quantity change for a seller SKU.
///
/// # Errors
///
/// Returns [`DbError::InvalidInput`] when neither price nor quantity is set,
/// or [`DbError::Sqlx`] if the insert fails.
pub async fn enqueue_amazon_update(
    pool: &PgPool,
    user_id: Uuid,
    entry: &NewAmazonQueueEntry,
) -> Result<i64, DbError> {
    if entry.price.is_none() && entry.quantity.is_none() {
        return Err(DbError::InvalidInput {
            field: "price",
            reason: "price or quantity is required".to_string(),
        });
    }

    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO amazon_sync_queue (user_id, inventory_item_id, sku, asin, price, quantity) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING id",
    )
    .bind(user_id)
    .bind(entry.inventory_item_id)
    .bind(&entry.sku)
    .bind(&entry.asin)
    .bind(entry.price)
    .bind(entry.quantity)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Moves up to `limit` rows to `processing` and returns them, oldest first.
///
/// Pending rows are claimable, and so are `processing` rows whose claim is
/// older than `lease`: their claimer was cancelled or crashed. Rows locked by
/// a concurrent claimer are skipped.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn claim_pending_amazon_updates(
    pool: &PgPool,
    user_id: Uuid,
    limit: i64,
    lease: Duration,
) -> Result<Vec<AmazonQueueRow>, DbError> {
    let sql = format!(
        "UPDATE amazon_sync_queue SET status = 'processing', claimed_at = NOW() \
         WHERE id IN ( \
             SELECT id FROM amazon_sync_queue \
             WHERE user_id = $1 \
               AND (status = 'pending' \
                    OR (status = 'processing' \
                        AND claimed_at < NOW() - make_interval(secs => $3))) \
             ORDER BY id \
             LIMIT $2 \
             FOR UPDATE SKIP LOCKED \
         ) \
         RETURNING {QUEUE_COLUMNS}"
    );
    let mut rows = sqlx::query_as::<_, AmazonQueueRow>(&sql)
        .bind(user_id)
        .bind(limit)
        .bind(lease.as_secs_f64())
        .fetch_all(pool)
        .await?;

    rows.sort_by_key(|r| r.id);
    Ok(rows)
}

/// Hands claimed rows back to `pending` so the next run picks them up.
/// Rows that already have an outcome are left alone.
///
/// Returns how many rows were released.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn release_amazon_claims(pool: &PgPool, ids: &[i64]) -> Result<u64, DbError> {
    if ids.is_empty() {
        return Ok(0);
    }
    let result = sqlx::query(
        "UPDATE amazon_sync_queue SET status = 'pending', claimed_at = NULL \
         WHERE id = ANY($1) AND status = 'processing'",
    )
    .bind(ids)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Writes the two-phase sync outcome for a claimed row. Rows no longer
/// `processing` (released meanwhile) are not touched.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn record_amazon_outcome(
    pool: &PgPool,
    id: i64,
    succeeded: bool,
    outcome: &str,
    error_message: Option<&str>,
) -> Result<(), DbError> {
    sqlx::query(
        "UPDATE amazon_sync_queue SET \
             status        = CASE WHEN $2 THEN 'completed' ELSE 'failed' END, \
             outcome       = $3, \
             error_message = $4, \
             processed_at  = NOW() \
         WHERE id = $1 AND status = 'processing'",
    )
    .bind(id)
    .bind(succeeded)
    .bind(outcome)
    .bind(error_message)
    .execute(pool)
    .await?;

    Ok(())
}
