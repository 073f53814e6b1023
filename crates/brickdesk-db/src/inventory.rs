//! Database operations for `inventory_items`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use brickdesk_core::InventoryStatus;

use crate::DbError;

/// A row from the `inventory_items` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct InventoryItemRow {
    pub id: i64,
    pub user_id: Uuid,
    pub purchase_id: Option<i64>,
    pub set_number: String,
    pub item_name: Option<String>,
    pub condition: String,
    pub status: String,
    pub cost: Decimal,
    pub sku: Option<String>,
    pub listing_platform: Option<String>,
    pub listing_price: Option<Decimal>,
    pub sold_price: Option<Decimal>,
    pub sold_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InventoryItemRow {
    /// Parses the stored status string.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Corrupt`] if the column holds an unknown value.
    pub fn status(&self) -> Result<InventoryStatus, DbError> {
        Ok(self.status.parse()?)
    }
}

#[derive(Debug, Clone, Default)]
pub struct InventoryFilters<'a> {
    pub status: Option<InventoryStatus>,
    pub set_number: Option<&'a str>,
    pub limit: i64,
}

/// Extra values written alongside a status change.
#[derive(Debug, Clone, Default)]
pub struct TransitionDetails {
    pub listing_platform: Option<String>,
    pub listing_price: Option<Decimal>,
    pub sold_price: Option<Decimal>,
}

const INVENTORY_COLUMNS: &str = "id, user_id, purchase_id, set_number, item_name, condition, \
     status, cost, sku, listing_platform, listing_price, sold_price, sold_at, \
     created_at, updated_at";

/// Lists a tenant's stock, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_inventory(
    pool: &PgPool,
    user_id: Uuid,
    filters: InventoryFilters<'_>,
) -> Result<Vec<InventoryItemRow>, DbError> {
    let sql = format!(
        "SELECT {INVENTORY_COLUMNS} \
         FROM inventory_items \
         WHERE user_id = $1 \
           AND ($2::TEXT IS NULL OR status = $2) \
           AND ($3::TEXT IS NULL OR set_number = $3) \
         ORDER BY created_at DESC, id DESC \
         LIMIT $4"
    );
    let rows = sqlx::query_as::<_, InventoryItemRow>(&sql)
        .bind(user_id)
        .bind(filters.status.map(InventoryStatus::as_str))
        .bind(filters.set_number)
        .bind(filters.limit)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// Fetches one item owned by `user_id`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the item does not exist for this tenant.
pub async fn get_inventory_item(
    pool: &PgPool,
    user_id: Uuid,
    id: i64,
) -> Result<InventoryItemRow, DbError> {
    let sql = format!("SELECT {INVENTORY_COLUMNS} FROM inventory_items WHERE id = $1 AND user_id = $2");
    sqlx::query_as::<_, InventoryItemRow>(&sql)
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)
}

/// Moves an item along BACKLOG → LISTED → SOLD (or back from LISTED to BACKLOG).
///
/// The update is conditional on the status read beforehand, so a concurrent
/// change surfaces as [`DbError::InvalidInventoryTransition`] instead of
/// silently overwriting it.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] for unknown items,
/// [`DbError::InvalidInventoryTransition`] for disallowed moves, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn transition_inventory_status(
    pool: &PgPool,
    user_id: Uuid,
    id: i64,
    next: InventoryStatus,
    details: &TransitionDetails,
) -> Result<InventoryItemRow, DbError> {
    let current = get_inventory_item(pool, user_id, id).await?.status()?;

    if !current.can_transition_to(next) {
        return Err(DbError::InvalidInventoryTransition {
            id,
            from: current,
            to: next,
        });
    }

    let sql = format!(
        "UPDATE inventory_items SET \
             status           = $1, \
             listing_platform = CASE WHEN $1 = 'BACKLOG' THEN NULL \
                                     ELSE COALESCE($4, listing_platform) END, \
             listing_price    = CASE WHEN $1 = 'BACKLOG' THEN NULL \
                                     ELSE COALESCE($5, listing_price) END, \
             sold_price       = CASE WHEN $1 = 'SOLD' THEN COALESCE($6, listing_price) \
                                     ELSE sold_price END, \
             sold_at          = CASE WHEN $1 = 'SOLD' THEN NOW() ELSE sold_at END, \
             updated_at       = NOW() \
         WHERE id = $2 AND user_id = $3 AND status = $7 \
         RETURNING {INVENTORY_COLUMNS}"
    );
    let row = sqlx::query_as::<_, InventoryItemRow>(&sql)
        .bind(next.as_str())
        .bind(id)
        .bind(user_id)
        .bind(&details.listing_platform)
        .bind(details.listing_price)
        .bind(details.sold_price)
        .bind(current.as_str())
        .fetch_optional(pool)
        .await?;

    row.ok_or(DbError::InvalidInventoryTransition {
        id,
        from: current,
        to: next,
    })
}
