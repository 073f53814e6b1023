//! Set catalogue, ASIN discovery state, Amazon pricing, and price history.
//!
//! These tables are shared reference data and carry no `user_id`.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use brickdesk_core::{CatalogSet, DiscoveryStatus};

use crate::DbError;

/// `price_snapshots.source` for Keepa buy-box history.
pub const KEEPA_BUYBOX_SOURCE: &str = "keepa_amazon_buybox";

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BricksetSetRow {
    pub id: i64,
    pub set_number: String,
    pub set_name: String,
    pub theme: Option<String>,
    pub year_from: Option<i32>,
    pub ean: Option<String>,
    pub upc: Option<String>,
    pub uk_retail_price: Option<Decimal>,
    pub us_retail_price: Option<Decimal>,
    pub de_retail_price: Option<Decimal>,
    pub rrp_source: Option<String>,
    pub retirement_status: String,
    pub updated_at: DateTime<Utc>,
}

/// A set still waiting for ASIN discovery.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DiscoveryCandidateRow {
    pub set_number: String,
    pub set_name: String,
    pub ean: Option<String>,
    pub upc: Option<String>,
}

/// A set whose ASIN has been found, with its catalogue context.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FoundAsinRow {
    pub set_number: String,
    pub set_name: String,
    pub theme: Option<String>,
    pub uk_retail_price: Option<Decimal>,
    pub asin: String,
}

/// An active set with no usable UK RRP, plus every fallback input.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MissingRrpRow {
    pub set_number: String,
    pub year_from: Option<i32>,
    pub us_retail_price: Option<Decimal>,
    pub de_retail_price: Option<Decimal>,
    pub amazon_price: Option<Decimal>,
}

/// Outcome of discovery for one set.
#[derive(Debug, Clone)]
pub struct DiscoveryUpdate<'a> {
    pub set_number: &'a str,
    pub status: DiscoveryStatus,
    pub asin: Option<&'a str>,
    pub match_method: Option<&'a str>,
    pub match_confidence: Option<i16>,
    pub amazon_title: Option<&'a str>,
    pub alternative_asins: &'a [String],
    pub error_message: Option<&'a str>,
}

// ---------------------------------------------------------------------------
// brickset_sets
// ---------------------------------------------------------------------------

/// Upserts a Brickset catalogue entry and makes sure it has a discovery row.
///
/// A missing UK price in the incoming record never erases one already stored.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if either statement fails.
pub async fn upsert_brickset_set(pool: &PgPool, set: &CatalogSet) -> Result<i64, DbError> {
    let mut tx = pool.begin().await?;

    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO brickset_sets \
             (set_number, set_name, theme, year_from, ean, upc, \
              uk_retail_price, us_retail_price, de_retail_price, rrp_source) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, \
                 CASE WHEN $7::NUMERIC IS NULL THEN NULL ELSE 'brickset' END) \
         ON CONFLICT (set_number) DO UPDATE SET \
             set_name        = EXCLUDED.set_name, \
             theme           = EXCLUDED.theme, \
             year_from       = EXCLUDED.year_from, \
             ean             = COALESCE(EXCLUDED.ean, brickset_sets.ean), \
             upc             = COALESCE(EXCLUDED.upc, brickset_sets.upc), \
             uk_retail_price = COALESCE(EXCLUDED.uk_retail_price, brickset_sets.uk_retail_price), \
             us_retail_price = COALESCE(EXCLUDED.us_retail_price, brickset_sets.us_retail_price), \
             de_retail_price = COALESCE(EXCLUDED.de_retail_price, brickset_sets.de_retail_price), \
             rrp_source      = COALESCE(EXCLUDED.rrp_source, brickset_sets.rrp_source), \
             updated_at      = NOW() \
         RETURNING id",
    )
    .bind(&set.set_number)
    .bind(&set.set_name)
    .bind(&set.theme)
    .bind(set.year)
    .bind(&set.ean)
    .bind(&set.upc)
    .bind(set.uk_retail_price)
    .bind(set.us_retail_price)
    .bind(set.de_retail_price)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        "INSERT INTO seeded_asins (brickset_set_id) VALUES ($1) \
         ON CONFLICT (brickset_set_id) DO NOTHING",
    )
    .bind(id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(id)
}

/// # Errors
///
/// Returns [`DbError::NotFound`] if the set is not in the catalogue.
pub async fn get_brickset_set(pool: &PgPool, set_number: &str) -> Result<BricksetSetRow, DbError> {
    sqlx::query_as::<_, BricksetSetRow>(
        "SELECT id, set_number, set_name, theme, year_from, ean, upc, uk_retail_price, \
                us_retail_price, de_retail_price, rrp_source, retirement_status, updated_at \
         FROM brickset_sets WHERE set_number = $1",
    )
    .bind(set_number)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Active sets whose UK RRP is unknown or below £5.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_sets_missing_rrp(pool: &PgPool) -> Result<Vec<MissingRrpRow>, DbError> {
    let rows = sqlx::query_as::<_, MissingRrpRow>(
        "SELECT s.set_number, s.year_from, s.us_retail_price, s.de_retail_price, p.amazon_price \
         FROM brickset_sets s \
         LEFT JOIN seeded_asin_pricing p ON p.set_number = s.set_number \
         WHERE s.retirement_status IN ('available', 'retiring_soon') \
           AND (s.uk_retail_price IS NULL OR s.uk_retail_price < 5) \
         ORDER BY s.set_number",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Sets the UK RRP and records which source produced it.
///
/// Returns `false` if the set does not exist.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn set_uk_rrp(
    pool: &PgPool,
    set_number: &str,
    price: Decimal,
    source: &str,
) -> Result<bool, DbError> {
    let result = sqlx::query(
        "UPDATE brickset_sets \
         SET uk_retail_price = $2, rrp_source = $3, updated_at = NOW() \
         WHERE set_number = $1",
    )
    .bind(set_number)
    .bind(price)
    .bind(source)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

// ---------------------------------------------------------------------------
// seeded_asins
// ---------------------------------------------------------------------------

/// Pending discovery candidates in stable id order.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_discovery_candidates(
    pool: &PgPool,
    offset: i64,
    limit: i64,
) -> Result<Vec<DiscoveryCandidateRow>, DbError> {
    let rows = sqlx::query_as::<_, DiscoveryCandidateRow>(
        "SELECT s.set_number, s.set_name, s.ean, s.upc \
         FROM seeded_asins a \
         JOIN brickset_sets s ON s.id = a.brickset_set_id \
         WHERE a.discovery_status = 'pending' \
         ORDER BY a.id \
         OFFSET $1 LIMIT $2",
    )
    .bind(offset)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Persists the discovery outcome for one set.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the set has no discovery row, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn record_discovery_result(
    pool: &PgPool,
    update: &DiscoveryUpdate<'_>,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE seeded_asins a SET \
             discovery_status       = $2, \
             asin                   = $3, \
             match_method           = $4, \
             match_confidence       = $5, \
             amazon_title           = $6, \
             alternative_asins      = $7, \
             error_message          = $8, \
             discovery_attempted_at = NOW(), \
             updated_at             = NOW() \
         FROM brickset_sets s \
         WHERE a.brickset_set_id = s.id AND s.set_number = $1",
    )
    .bind(update.set_number)
    .bind(update.status.as_str())
    .bind(update.asin)
    .bind(update.match_method)
    .bind(update.match_confidence)
    .bind(update.amazon_title)
    .bind(update.alternative_asins)
    .bind(update.error_message)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Sets with a discovered ASIN, optionally restricted to `set_numbers`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_found_asins(
    pool: &PgPool,
    set_numbers: Option<&[String]>,
) -> Result<Vec<FoundAsinRow>, DbError> {
    let rows = sqlx::query_as::<_, FoundAsinRow>(
        "SELECT s.set_number, s.set_name, s.theme, s.uk_retail_price, a.asin \
         FROM seeded_asins a \
         JOIN brickset_sets s ON s.id = a.brickset_set_id \
         WHERE a.discovery_status = 'found' \
           AND a.asin IS NOT NULL \
           AND ($1::TEXT[] IS NULL OR s.set_number = ANY($1)) \
         ORDER BY s.set_number",
    )
    .bind(set_numbers)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

// ---------------------------------------------------------------------------
// seeded_asin_pricing / price_snapshots
// ---------------------------------------------------------------------------

/// Records the latest Amazon price for a set's ASIN.
///
/// `None` values keep whatever is stored.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_asin_pricing(
    pool: &PgPool,
    set_number: &str,
    asin: &str,
    amazon_price: Option<Decimal>,
    was_price_90d: Option<Decimal>,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO seeded_asin_pricing (set_number, asin, amazon_price, was_price_90d) \
         VALUES ($1, $2, $3, $4) \
         ON CONFLICT (set_number) DO UPDATE SET \
             asin          = EXCLUDED.asin, \
             amazon_price  = COALESCE(EXCLUDED.amazon_price, seeded_asin_pricing.amazon_price), \
             was_price_90d = COALESCE(EXCLUDED.was_price_90d, seeded_asin_pricing.was_price_90d), \
             updated_at    = NOW()",
    )
    .bind(set_number)
    .bind(asin)
    .bind(amazon_price)
    .bind(was_price_90d)
    .execute(pool)
    .await?;

    Ok(())
}

/// Inserts one daily price point. Returns `false` if that day was already
/// recorded for this set and source.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_price_snapshot(
    pool: &PgPool,
    set_number: &str,
    asin: Option<&str>,
    date: NaiveDate,
    price_gbp: Decimal,
    source: &str,
) -> Result<bool, DbError> {
    let result = sqlx::query(
        "INSERT INTO price_snapshots (set_num, asin, date, price_gbp, source) \
         VALUES ($1, $2, $3, $4, $5) \
         ON CONFLICT (set_num, date, source) DO NOTHING",
    )
    .bind(set_number)
    .bind(asin)
    .bind(date)
    .bind(price_gbp)
    .bind(source)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// All recorded prices for the given sets from one source, as
/// `(set_number, price)` pairs.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_snapshot_prices(
    pool: &PgPool,
    set_numbers: &[String],
    source: &str,
) -> Result<Vec<(String, Decimal)>, DbError> {
    let rows = sqlx::query_as::<_, (String, Decimal)>(
        "SELECT set_num, price_gbp FROM price_snapshots \
         WHERE source = $1 AND set_num = ANY($2) \
         ORDER BY set_num, date",
    )
    .bind(source)
    .bind(set_numbers)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
