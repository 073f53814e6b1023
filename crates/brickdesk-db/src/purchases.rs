//! Purchases and the stock items bought with them.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::inventory::InventoryItemRow;
use crate::DbError;

/// A row from the `purchases` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PurchaseRow {
    pub id: i64,
    pub user_id: Uuid,
    pub purchase_date: NaiveDate,
    pub source: String,
    pub description: Option<String>,
    pub total_cost: Decimal,
    pub payment_method: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPurchase {
    pub purchase_date: NaiveDate,
    pub source: String,
    pub description: Option<String>,
    pub total_cost: Decimal,
    pub payment_method: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewInventoryItem {
    pub set_number: String,
    pub item_name: Option<String>,
    pub condition: String,
    pub cost: Decimal,
    pub sku: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreatedPurchase {
    pub purchase: PurchaseRow,
    pub items: Vec<InventoryItemRow>,
}

fn validate(purchase: &NewPurchase, items: &[NewInventoryItem]) -> Result<(), DbError> {
    if purchase.source.trim().is_empty() {
        return Err(DbError::InvalidInput {
            field: "source",
            reason: "must not be empty".to_string(),
        });
    }
    if purchase.total_cost < Decimal::ZERO {
        return Err(DbError::InvalidInput {
            field: "total_cost",
            reason: "must not be negative".to_string(),
        });
    }
    for item in items {
        if item.set_number.trim().is_empty() {
            return Err(DbError::InvalidInput {
                field: "set_number",
                reason: "must not be empty".to_string(),
            });
        }
        if item.condition != "new" && item.condition != "used" {
            return Err(DbError::InvalidInput {
                field: "condition",
                reason: format!("expected 'new' or 'used', got '{}'", item.condition),
            });
        }
    }
    Ok(())
}

/// Records a purchase and its inventory items in one transaction.
///
/// Items start in `BACKLOG`. If any item insert fails the purchase row is
/// rolled back with it.
///
/// # Errors
///
/// Returns [`DbError::InvalidInput`] for malformed input, or
/// [`DbError::Sqlx`] if any statement fails.
pub async fn create_purchase_with_items(
    pool: &PgPool,
    user_id: Uuid,
    purchase: &NewPurchase,
    items: &[NewInventoryItem],
) -> Result<CreatedPurchase, DbError> {
    validate(purchase, items)?;

    let mut tx = pool.begin().await?;

    let purchase_row = sqlx::query_as::<_, PurchaseRow>(
        "INSERT INTO purchases \
             (user_id, purchase_date, source, description, total_cost, payment_method) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING id, user_id, purchase_date, source, description, total_cost, \
                   payment_method, created_at",
    )
    .bind(user_id)
    .bind(purchase.purchase_date)
    .bind(&purchase.source)
    .bind(&purchase.description)
    .bind(purchase.total_cost)
    .bind(&purchase.payment_method)
    .fetch_one(&mut *tx)
    .await?;

    let mut created = Vec::with_capacity(items.len());
    for item in items {
        let row = sqlx::query_as::<_, InventoryItemRow>(
            "INSERT INTO inventory_items \
                 (user_id, purchase_id, set_number, item_name, condition, cost, sku) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING id, user_id, purchase_id, set_number, item_name, condition, status, \
                       cost, sku, listing_platform, listing_price, sold_price, sold_at, \
                       created_at, updated_at",
        )
        .bind(user_id)
        .bind(purchase_row.id)
        .bind(&item.set_number)
        .bind(&item.item_name)
        .bind(&item.condition)
        .bind(item.cost)
        .bind(&item.sku)
        .fetch_one(&mut *tx)
        .await?;
        created.push(row);
    }

    tx.commit().await?;

    tracing::info!(
        purchase_id = purchase_row.id,
        items = created.len(),
        "purchase recorded"
    );

    Ok(CreatedPurchase {
        purchase: purchase_row,
        items: created,
    })
}
