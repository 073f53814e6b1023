//! Database operations for `platform_orders`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use brickdesk_core::{NewPlatformOrder, OrderStatus, Platform};

use crate::DbError;

/// A row from the `platform_orders` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PlatformOrderRow {
    pub id: i64,
    pub user_id: Uuid,
    pub platform: String,
    pub platform_order_id: String,
    pub status: String,
    pub order_date: DateTime<Utc>,
    pub buyer_name: Option<String>,
    pub item_count: i32,
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub fees: Decimal,
    pub total: Decimal,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OrderFilters {
    pub platform: Option<Platform>,
    pub status: Option<OrderStatus>,
    pub limit: i64,
}

/// Inserts or refreshes an order imported from a sales platform.
///
/// Conflicts on `(user_id, platform, platform_order_id)` update status,
/// money columns, and `updated_at` in place. Returns the row id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_platform_order(
    pool: &PgPool,
    user_id: Uuid,
    order: &NewPlatformOrder,
) -> Result<i64, DbError> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO platform_orders \
             (user_id, platform, platform_order_id, status, order_date, buyer_name, \
              item_count, subtotal, shipping, fees, total, currency) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
         ON CONFLICT (user_id, platform, platform_order_id) DO UPDATE SET \
             status     = EXCLUDED.status, \
             buyer_name = EXCLUDED.buyer_name, \
             item_count = EXCLUDED.item_count, \
             subtotal   = EXCLUDED.subtotal, \
             shipping   = EXCLUDED.shipping, \
             fees       = EXCLUDED.fees, \
             total      = EXCLUDED.total, \
             currency   = EXCLUDED.currency, \
             updated_at = NOW() \
         RETURNING id",
    )
    .bind(user_id)
    .bind(order.platform.as_str())
    .bind(&order.platform_order_id)
    .bind(order.status.as_str())
    .bind(order.order_date)
    .bind(&order.buyer_name)
    .bind(order.item_count)
    .bind(order.subtotal)
    .bind(order.shipping)
    .bind(order.fees)
    .bind(order.total)
    .bind(&order.currency)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Lists a tenant's orders, most recent first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_platform_orders(
    pool: &PgPool,
    user_id: Uuid,
    filters: OrderFilters,
) -> Result<Vec<PlatformOrderRow>, DbError> {
    let rows = sqlx::query_as::<_, PlatformOrderRow>(
        "SELECT id, user_id, platform, platform_order_id, status, order_date, buyer_name, \
                item_count, subtotal, shipping, fees, total, currency, created_at, updated_at \
         FROM platform_orders \
         WHERE user_id = $1 \
           AND ($2::TEXT IS NULL OR platform = $2) \
           AND ($3::TEXT IS NULL OR status = $3) \
         ORDER BY order_date DESC, id DESC \
         LIMIT $4",
    )
    .bind(user_id)
    .bind(filters.platform.map(Platform::as_str))
    .bind(filters.status.map(OrderStatus::as_str))
    .bind(filters.limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
