//! Current Keepa prices for a hand-picked list of sets.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;

use brickdesk_db::FoundAsinRow;
use brickdesk_keepa::{extract_prices, KeepaClient, KeepaProduct};

use crate::error::SyncError;

/// ASINs per Keepa request in an export.
pub const EXPORT_BATCH_SIZE: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeepaExportRow {
    pub set_number: String,
    pub asin: String,
    pub rrp: Option<Decimal>,
    pub current_price: Option<Decimal>,
    pub was90: Option<Decimal>,
    pub price_1yr_ago: Option<Decimal>,
}

/// One row per set, in `sets` order. Sets whose ASIN Keepa did not return
/// keep empty price columns.
#[must_use]
pub fn build_export_rows(
    sets: &[FoundAsinRow],
    products: &[KeepaProduct],
    now: DateTime<Utc>,
) -> Vec<KeepaExportRow> {
    let by_asin: HashMap<&str, &KeepaProduct> =
        products.iter().map(|p| (p.asin.as_str(), p)).collect();

    sets.iter()
        .map(|set| {
            let prices = by_asin
                .get(set.asin.as_str())
                .map(|p| extract_prices(p, now));
            KeepaExportRow {
                set_number: set.set_number.clone(),
                asin: set.asin.clone(),
                rrp: set.uk_retail_price,
                current_price: prices.as_ref().and_then(|p| p.current_buy_box),
                was90: prices.as_ref().and_then(|p| p.was90),
                price_1yr_ago: prices.and_then(|p| p.price_1yr_ago),
            }
        })
        .collect()
}

/// Resolves ASINs for `set_numbers` and prices them through Keepa.
/// Sets without a discovered ASIN are logged and left out.
///
/// # Errors
///
/// Returns [`SyncError::Validation`] for an empty list, [`SyncError::Db`] or
/// [`SyncError::Keepa`] on failure.
pub async fn export_keepa_prices(
    pool: &PgPool,
    client: &KeepaClient,
    set_numbers: &[String],
) -> Result<Vec<KeepaExportRow>, SyncError> {
    if set_numbers.is_empty() {
        return Err(SyncError::Validation {
            field: "set_numbers",
            reason: "at least one set number is required".to_owned(),
        });
    }

    let found = brickdesk_db::list_found_asins(pool, Some(set_numbers)).await?;
    for missing in set_numbers
        .iter()
        .filter(|s| !found.iter().any(|f| &f.set_number == *s))
    {
        tracing::warn!(set_number = %missing, "no ASIN on file, skipping");
    }

    let mut asins: Vec<String> = found.iter().map(|f| f.asin.clone()).collect();
    asins.sort();
    asins.dedup();

    let mut products = Vec::with_capacity(asins.len());
    for batch in asins.chunks(EXPORT_BATCH_SIZE) {
        products.extend(client.products_by_asin(batch).await?);
    }

    Ok(build_export_rows(&found, &products, Utc::now()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn found(set_number: &str, asin: &str, rrp: Option<i64>) -> FoundAsinRow {
        FoundAsinRow {
            set_number: set_number.to_owned(),
            set_name: format!("Set {set_number}"),
            theme: None,
            uk_retail_price: rrp.map(|p| Decimal::new(p, 2)),
            asin: asin.to_owned(),
        }
    }

    #[test]
    fn rows_follow_set_order_and_tolerate_missing_products() {
        let sets = [found("75192-1", "B075SDMMMV", Some(64_999)), found("10294-1", "B09BNZBG4F", None)];
        let products = [KeepaProduct {
            asin: "B075SDMMMV".to_owned(),
            ..KeepaProduct::default()
        }];

        let rows = build_export_rows(&sets, &products, Utc::now());

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].set_number, "75192-1");
        assert_eq!(rows[0].rrp, Some(Decimal::new(64_999, 2)));
        assert_eq!(rows[1].asin, "B09BNZBG4F");
        assert!(rows[1].current_price.is_none());
        assert!(rows[1].was90.is_none());
    }
}
