use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::pricing::round_money;
use crate::status::Platform;

#[derive(Debug, Clone, PartialEq)]
pub struct ArbitrageConfig {
    pub referral_fee_pct: Decimal,
    pub fulfilment_fee: Decimal,
    pub inbound_shipping: Decimal,
    pub min_margin_pct: Decimal,
}

impl Default for ArbitrageConfig {
    fn default() -> Self {
        Self {
            referral_fee_pct: Decimal::new(153, 1),
            fulfilment_fee: Decimal::new(300, 2),
            inbound_shipping: Decimal::ZERO,
            min_margin_pct: Decimal::new(20, 0),
        }
    }
}

/// Observed prices for one set: the Amazon sell side and the cheapest
/// buy-side listing on each source marketplace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArbitragePrices {
    pub amazon_price: Option<Decimal>,
    pub bricklink_min_price: Option<Decimal>,
    pub ebay_min_price: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArbitrageResult {
    pub source: Platform,
    pub source_price: Decimal,
    pub amazon_price: Decimal,
    pub amazon_fees: Decimal,
    pub profit: Decimal,
    pub margin_pct: Decimal,
    pub is_opportunity: bool,
}

/// Buy on the cheapest source, sell on Amazon.
///
/// Returns `None` when the Amazon price or every source price is missing.
#[must_use]
pub fn evaluate_arbitrage(prices: &ArbitragePrices, cfg: &ArbitrageConfig) -> Option<ArbitrageResult> {
    let amazon_price = prices.amazon_price.filter(|p| *p > Decimal::ZERO)?;

    let (source, source_price) = [
        (Platform::Bricklink, prices.bricklink_min_price),
        (Platform::Ebay, prices.ebay_min_price),
    ]
    .into_iter()
    .filter_map(|(platform, price)| price.filter(|p| *p > Decimal::ZERO).map(|p| (platform, p)))
    .min_by(|a, b| a.1.cmp(&b.1))?;

    let amazon_fees =
        round_money(amazon_price * cfg.referral_fee_pct / Decimal::ONE_HUNDRED + cfg.fulfilment_fee);
    let profit = amazon_price - amazon_fees - source_price - cfg.inbound_shipping;
    let margin_pct = round_money(profit / amazon_price * Decimal::ONE_HUNDRED);

    Some(ArbitrageResult {
        source,
        source_price,
        amazon_price,
        amazon_fees,
        profit,
        margin_pct,
        is_opportunity: margin_pct >= cfg.min_margin_pct,
    })
}
