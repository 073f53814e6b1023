//! Buy-box price history extraction.
//!
//! Keepa timestamps are minutes since 2011-01-01 UTC and prices are integer
//! pence, with negative values meaning out of stock.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::types::KeepaProduct;

/// Minutes between the Unix epoch and the Keepa epoch.
pub const KEEPA_EPOCH_MINUTES: i64 = 21_564_000;

/// CSV type index of the buy-box price (shipping included).
pub const BUY_BOX_INDEX: usize = 18;

const YEAR_AGO_DAYS: i64 = 365;
const YEAR_AGO_TOLERANCE_DAYS: i64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriceSummary {
    pub asin: String,
    pub current_buy_box: Option<Decimal>,
    pub was90: Option<Decimal>,
    pub price_1yr_ago: Option<Decimal>,
}

#[must_use]
pub fn keepa_minutes_to_datetime(keepa_minutes: i64) -> Option<DateTime<Utc>> {
    let unix_secs = keepa_minutes
        .checked_add(KEEPA_EPOCH_MINUTES)?
        .checked_mul(60)?;
    DateTime::from_timestamp(unix_secs, 0)
}

fn pence(value: i64) -> Option<Decimal> {
    (value >= 0).then(|| Decimal::new(value, 2))
}

/// Parses `[t, v, t, v, ...]` into in-stock `(time, price)` points.
///
/// Out-of-stock points and a trailing unpaired timestamp are dropped.
#[must_use]
pub fn parse_price_history(raw: &[i64]) -> Vec<(DateTime<Utc>, Decimal)> {
    raw.chunks_exact(2)
        .filter_map(|pair| {
            let at = keepa_minutes_to_datetime(pair[0])?;
            let price = pence(pair[1])?;
            Some((at, price))
        })
        .collect()
}

fn stat_at(values: Option<&Vec<Option<i64>>>) -> Option<Decimal> {
    values
        .and_then(|v| v.get(BUY_BOX_INDEX).copied().flatten())
        .and_then(pence)
}

/// Pulls current buy box, 90-day average ("was90"), and the price closest to
/// one year before `now` out of a product fetched with `stats=90&history=1`.
#[must_use]
pub fn extract_prices(product: &KeepaProduct, now: DateTime<Utc>) -> PriceSummary {
    let stats = product.stats.as_ref();
    let mut current_buy_box = stat_at(stats.and_then(|s| s.current.as_ref()));
    let was90 = stat_at(stats.and_then(|s| s.avg90.as_ref()));

    let history = product
        .csv
        .as_ref()
        .and_then(|csv| csv.get(BUY_BOX_INDEX))
        .and_then(Option::as_deref)
        .map(parse_price_history)
        .unwrap_or_default();

    if current_buy_box.is_none() {
        current_buy_box = history.last().map(|(_, price)| *price);
    }

    let target = now - Duration::days(YEAR_AGO_DAYS);
    let price_1yr_ago = history
        .iter()
        .min_by_key(|(at, _)| (*at - target).num_seconds().abs())
        .filter(|(at, _)| (*at - target).num_days().abs() <= YEAR_AGO_TOLERANCE_DAYS)
        .map(|(_, price)| *price);

    PriceSummary {
        asin: product.asin.clone(),
        current_buy_box,
        was90,
        price_1yr_ago,
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::types::KeepaStats;

    fn to_keepa(at: DateTime<Utc>) -> i64 {
        at.timestamp() / 60 - KEEPA_EPOCH_MINUTES
    }

    fn stats_with(index_value: i64) -> Vec<Option<i64>> {
        let mut v = vec![Some(-1); BUY_BOX_INDEX + 1];
        v[BUY_BOX_INDEX] = Some(index_value);
        v
    }

    #[test]
    fn keepa_epoch_is_2011() {
        let at = keepa_minutes_to_datetime(0).unwrap();
        assert_eq!(at, Utc.with_ymd_and_hms(2011, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn history_skips_out_of_stock_and_odd_tail() {
        let points = parse_price_history(&[100, 4999, 200, -1, 300, 5499, 400]);
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].1, Decimal::new(4999, 2));
        assert_eq!(points[1].1, Decimal::new(5499, 2));
    }

    #[test]
    fn extracts_stats_and_year_ago_point() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        let near_year_ago = now - Duration::days(370);
        let far = now - Duration::days(200);
        let product = KeepaProduct {
            asin: "B0BBSF8T3R".to_string(),
            stats: Some(KeepaStats {
                current: Some(stats_with(45_999)),
                avg90: Some(stats_with(47_250)),
            }),
            csv: Some({
                let mut csv = vec![None; BUY_BOX_INDEX + 1];
                csv[BUY_BOX_INDEX] = Some(vec![
                    to_keepa(near_year_ago),
                    42_999,
                    to_keepa(far),
                    44_000,
                ]);
                csv
            }),
            ..KeepaProduct::default()
        };

        let summary = extract_prices(&product, now);
        assert_eq!(summary.current_buy_box, Some(Decimal::new(45_999, 2)));
        assert_eq!(summary.was90, Some(Decimal::new(47_250, 2)));
        assert_eq!(summary.price_1yr_ago, Some(Decimal::new(42_999, 2)));
    }

    #[test]
    fn falls_back_to_last_history_point_for_current() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        let product = KeepaProduct {
            asin: "B0X".to_string(),
            stats: Some(KeepaStats {
                current: Some(stats_with(-1)),
                avg90: None,
            }),
            csv: Some({
                let mut csv = vec![None; BUY_BOX_INDEX + 1];
                csv[BUY_BOX_INDEX] = Some(vec![
                    to_keepa(now - Duration::days(10)),
                    3_999,
                    to_keepa(now - Duration::days(2)),
                    3_499,
                ]);
                csv
            }),
            ..KeepaProduct::default()
        };

        let summary = extract_prices(&product, now);
        assert_eq!(summary.current_buy_box, Some(Decimal::new(3_499, 2)));
        assert_eq!(summary.was90, None);
        assert_eq!(summary.price_1yr_ago, None, "no point within 30 days of a year ago");
    }

    #[test]
    fn product_without_data_yields_empty_summary() {
        let summary = extract_prices(
            &KeepaProduct {
                asin: "B0EMPTY".to_string(),
                ..KeepaProduct::default()
            },
            Utc::now(),
        );
        assert_eq!(summary.asin, "B0EMPTY");
        assert!(summary.current_buy_box.is_none());
        assert!(summary.was90.is_none());
        assert!(summary.price_1yr_ago.is_none());
    }
}
