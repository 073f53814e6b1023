//! Buy-side and sell-side prices joined for arbitrage evaluation.

use rust_decimal::Decimal;
use sqlx::PgPool;

use brickdesk_core::ArbitragePrices;

use crate::DbError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ArbitrageCandidateRow {
    pub set_number: String,
    pub set_name: String,
    pub asin: String,
    pub uk_retail_price: Option<Decimal>,
    pub amazon_price: Option<Decimal>,
    pub bricklink_min_price: Option<Decimal>,
    pub ebay_min_price: Option<Decimal>,
}

impl ArbitrageCandidateRow {
    #[must_use]
    pub fn prices(&self) -> ArbitragePrices {
        ArbitragePrices {
            amazon_price: self.amazon_price,
            bricklink_min_price: self.bricklink_min_price,
            ebay_min_price: self.ebay_min_price,
        }
    }
}

/// Sets with an Amazon price and at least one source price.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_arbitrage_candidates(
    pool: &PgPool,
    limit: i64,
) -> Result<Vec<ArbitrageCandidateRow>, DbError> {
    let rows = sqlx::query_as::<_, ArbitrageCandidateRow>(
        "SELECT s.set_number, s.set_name, p.asin, s.uk_retail_price, \
                p.amazon_price, p.bricklink_min_price, p.ebay_min_price \
         FROM seeded_asin_pricing p \
         JOIN brickset_sets s ON s.set_number = p.set_number \
         WHERE p.amazon_price IS NOT NULL \
           AND (p.bricklink_min_price IS NOT NULL OR p.ebay_min_price IS NOT NULL) \
         ORDER BY p.updated_at DESC, s.set_number \
         LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Stores the cheapest BrickLink / eBay listings seen for a set. A `None`
/// price leaves the stored value for that source untouched.
///
/// Returns `false` when the set has no pricing row yet.
///
/// # Errors
///
/// Returns [`DbError::InvalidInput`] for a negative price, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn update_source_prices(
    pool: &PgPool,
    set_number: &str,
    bricklink_min_price: Option<Decimal>,
    ebay_min_price: Option<Decimal>,
) -> Result<bool, DbError> {
    for (field, price) in [
        ("bricklink_min_price", bricklink_min_price),
        ("ebay_min_price", ebay_min_price),
    ] {
        if price.is_some_and(|p| p.is_sign_negative() && !p.is_zero()) {
            return Err(DbError::InvalidInput {
                field,
                reason: format!("{set_number}: price must not be negative"),
            });
        }
    }

    let result = sqlx::query(
        "UPDATE seeded_asin_pricing SET \
             bricklink_min_price = COALESCE($2, bricklink_min_price), \
             ebay_min_price      = COALESCE($3, ebay_min_price), \
             updated_at          = NOW() \
         WHERE set_number = $1",
    )
    .bind(set_number)
    .bind(bricklink_min_price)
    .bind(ebay_min_price)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}
