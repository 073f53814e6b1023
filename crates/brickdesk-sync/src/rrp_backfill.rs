//! UK RRP backfill for active sets that have no usable retail price.
//!
//! Sources are tried as a waterfall, each pass only over the sets still
//! missing after the previous one: Brickset UK price, current Amazon price,
//! the 95th percentile of Keepa buy-box history, and finally a converted US
//! or German RRP.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;

use brickdesk_core::{keepa_p95_proxy, regional_rrp, MIN_RRP_GBP};
use brickdesk_db::{MissingRrpRow, KEEPA_BUYBOX_SOURCE};
use brickdesk_marketplaces::BricksetClient;

use crate::error::SyncError;

pub const SOURCE_BRICKSET: &str = "brickset";
pub const SOURCE_AMAZON: &str = "amazon_price";
pub const SOURCE_KEEPA_P95: &str = "keepa_p95";
pub const SOURCE_REGIONAL: &str = "regional_conversion";

/// UK retail prices keyed by set number for the given release years.
#[async_trait]
pub trait UkPriceSource: Send + Sync {
    async fn uk_prices(&self, years: &[i32]) -> HashMap<String, Decimal>;
}

#[async_trait]
impl UkPriceSource for BricksetClient {
    async fn uk_prices(&self, years: &[i32]) -> HashMap<String, Decimal> {
        self.fetch_uk_prices(years).await
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RrpBackfillReport {
    pub initially_missing: usize,
    pub brickset: usize,
    pub amazon: usize,
    pub keepa_p95: usize,
    pub regional: usize,
    pub still_missing: usize,
}

/// Runs the waterfall. Pass `None` for `brickset` to skip the API pass.
///
/// # Errors
///
/// Returns [`SyncError::Db`] if a query fails.
pub async fn backfill_rrp(
    pool: &PgPool,
    brickset: Option<&dyn UkPriceSource>,
) -> Result<RrpBackfillReport, SyncError> {
    let mut report = RrpBackfillReport::default();

    let missing = brickdesk_db::list_sets_missing_rrp(pool).await?;
    report.initially_missing = missing.len();
    tracing::info!(missing = missing.len(), "RRP backfill started");

    if let Some(source) = brickset {
        let years: Vec<i32> = missing
            .iter()
            .filter_map(|r| r.year_from)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let prices = source.uk_prices(&years).await;
        report.brickset = apply(pool, &missing, SOURCE_BRICKSET, |row| {
            prices.get(&row.set_number).copied()
        })
        .await?;
    }

    let missing = brickdesk_db::list_sets_missing_rrp(pool).await?;
    report.amazon = apply(pool, &missing, SOURCE_AMAZON, |row| {
        row.amazon_price.filter(|p| *p >= MIN_RRP_GBP)
    })
    .await?;

    let missing = brickdesk_db::list_sets_missing_rrp(pool).await?;
    let set_numbers: Vec<String> = missing.iter().map(|r| r.set_number.clone()).collect();
    let mut history: HashMap<String, Vec<Decimal>> = HashMap::new();
    for (set_number, price) in
        brickdesk_db::list_snapshot_prices(pool, &set_numbers, KEEPA_BUYBOX_SOURCE).await?
    {
        history.entry(set_number).or_default().push(price);
    }
    report.keepa_p95 = apply(pool, &missing, SOURCE_KEEPA_P95, |row| {
        history.get(&row.set_number).and_then(|p| keepa_p95_proxy(p))
    })
    .await?;

    let missing = brickdesk_db::list_sets_missing_rrp(pool).await?;
    report.regional = apply(pool, &missing, SOURCE_REGIONAL, |row| {
        regional_rrp(row.us_retail_price, row.de_retail_price)
    })
    .await?;

    report.still_missing = brickdesk_db::list_sets_missing_rrp(pool).await?.len();
    tracing::info!(
        brickset = report.brickset,
        amazon = report.amazon,
        keepa_p95 = report.keepa_p95,
        regional = report.regional,
        still_missing = report.still_missing,
        "RRP backfill finished"
    );
    Ok(report)
}

async fn apply<F>(
    pool: &PgPool,
    rows: &[MissingRrpRow],
    source: &str,
    price_for: F,
) -> Result<usize, SyncError>
where
    F: Fn(&MissingRrpRow) -> Option<Decimal>,
{
    let mut updated = 0;
    for row in rows {
        let Some(price) = price_for(row) else {
            continue;
        };
        if brickdesk_db::set_uk_rrp(pool, &row.set_number, price, source).await? {
            tracing::debug!(set_number = %row.set_number, %price, source, "UK RRP set");
            updated += 1;
        }
    }
    Ok(updated)
}
