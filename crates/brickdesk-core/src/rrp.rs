//! UK RRP estimation used when the Brickset catalogue has no GBP retail price.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Anything below this is treated as noise rather than a retail price.
pub const MIN_RRP_GBP: Decimal = Decimal::from_parts(5, 0, 0, false, 0);

/// Keepa prices at or above this are marketplace outliers, not RRP signals.
const KEEPA_PRICE_CEILING: Decimal = Decimal::from_parts(500, 0, 0, false, 0);
const KEEPA_MIN_SAMPLES: usize = 3;

const USD_TO_GBP: Decimal = Decimal::from_parts(867, 0, 0, false, 3);
const EUR_TO_GBP: Decimal = Decimal::from_parts(889, 0, 0, false, 3);

/// Percentile `p` (0..=100) using linear interpolation between closest ranks.
#[must_use]
pub fn percentile(values: &[Decimal], p: Decimal) -> Option<Decimal> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort();

    let p = p.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED);
    let last = Decimal::from(sorted.len() - 1);
    let rank = p / Decimal::ONE_HUNDRED * last;
    let lower = rank.floor();
    let upper = rank.ceil();

    let lo_val = *sorted.get(lower.to_usize()?)?;
    let hi_val = *sorted.get(upper.to_usize()?)?;
    Some(lo_val + (hi_val - lo_val) * (rank - lower))
}

/// RRP proxy from Keepa buy-box history: the 95th percentile of in-range
/// prices. Needs at least three samples.
#[must_use]
pub fn keepa_p95_proxy(prices: &[Decimal]) -> Option<Decimal> {
    let valid: Vec<Decimal> = prices
        .iter()
        .copied()
        .filter(|p| *p > Decimal::ZERO && *p < KEEPA_PRICE_CEILING)
        .collect();
    if valid.len() < KEEPA_MIN_SAMPLES {
        return None;
    }

    let p95 = percentile(&valid, Decimal::new(95, 0))?.round_dp(2);
    (p95 >= MIN_RRP_GBP).then_some(p95)
}

/// Converts a US or German RRP to GBP. US wins when both are usable.
#[must_use]
pub fn regional_rrp(us_usd: Option<Decimal>, de_eur: Option<Decimal>) -> Option<Decimal> {
    let usable = |v: Option<Decimal>| v.filter(|p| *p >= MIN_RRP_GBP);

    let gbp = usable(us_usd)
        .map(|us| us * USD_TO_GBP)
        .or_else(|| usable(de_eur).map(|de| de * EUR_TO_GBP))?
        .round_dp(2);

    (gbp >= MIN_RRP_GBP).then_some(gbp)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(cents: i64) -> Decimal {
        Decimal::new(cents, 2)
    }

    #[test]
    fn percentile_interpolates() {
        let values = [d(1000), d(2000), d(3000), d(4000)];
        assert_eq!(percentile(&values, Decimal::new(50, 0)), Some(d(2500)));
        assert_eq!(percentile(&values, Decimal::ZERO), Some(d(1000)));
        assert_eq!(percentile(&values, Decimal::ONE_HUNDRED), Some(d(4000)));
        assert_eq!(percentile(&[], Decimal::new(50, 0)), None);
    }

    #[test]
    fn percentile_ignores_input_order() {
        let values = [d(3000), d(1000), d(2000)];
        assert_eq!(percentile(&values, Decimal::new(50, 0)), Some(d(2000)));
    }

    #[test]
    fn keepa_proxy_filters_outliers_and_needs_samples() {
        assert_eq!(keepa_p95_proxy(&[d(2000), d(2500)]), None);
        assert_eq!(keepa_p95_proxy(&[d(2000), d(60000), d(-100), d(2500)]), None);

        // sorted: 20, 25, 30; rank = 0.95 * 2 = 1.9 -> 25 + 5 * 0.9 = 29.5
        let p95 = keepa_p95_proxy(&[d(3000), d(2000), d(2500), d(0)]);
        assert_eq!(p95, Some(d(2950)));
    }

    #[test]
    fn keepa_proxy_rejects_tiny_results() {
        assert_eq!(keepa_p95_proxy(&[d(100), d(200), d(300)]), None);
    }

    #[test]
    fn regional_rrp_prefers_us() {
        // 49.99 * 0.867 = 43.341... -> 43.34
        assert_eq!(regional_rrp(Some(d(4999)), Some(d(5999))), Some(d(4334)));
        // 59.99 * 0.889 = 53.331... -> 53.33
        assert_eq!(regional_rrp(None, Some(d(5999))), Some(d(5333)));
        assert_eq!(regional_rrp(Some(d(299)), Some(d(5999))), Some(d(5333)));
    }

    #[test]
    fn regional_rrp_enforces_minimum() {
        assert_eq!(regional_rrp(Some(d(550)), None), None);
        assert_eq!(regional_rrp(None, None), None);
    }
}
