//! Minifig pricing engine.
//!
//! Pure arithmetic over market data gathered for a Bricqer minifig before it
//! is staged as an eBay listing: charm-price rounding, markup, listing
//! thresholds, profit after eBay fees, and Best Offer auto-accept/decline
//! levels. All money is `Decimal` in GBP.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Market observations for one minifig.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MinifigMarketData {
    /// BrickLink six-month average sold price.
    pub bricklink_avg_sold: Option<Decimal>,
    /// eBay average sold price over the research window.
    pub ebay_avg_sold: Option<Decimal>,
    pub ebay_sold_count: i32,
    pub ebay_active_count: i32,
    /// Sold / (sold + active) as a percentage, when eBay research ran.
    pub ebay_sell_through_pct: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PricingConfig {
    pub min_sold_count: i32,
    pub min_sell_through_pct: Decimal,
    pub min_avg_sold_price: Decimal,
    pub min_list_price: Decimal,
    pub bricklink_markup_pct: Decimal,
    pub final_value_fee_pct: Decimal,
    pub per_order_fee: Decimal,
    pub auto_accept_pct: Decimal,
    pub auto_decline_pct: Decimal,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            min_sold_count: 3,
            min_sell_through_pct: Decimal::new(30, 0),
            min_avg_sold_price: Decimal::new(300, 2),
            min_list_price: Decimal::new(299, 2),
            bricklink_markup_pct: Decimal::new(25, 0),
            final_value_fee_pct: Decimal::new(128, 1),
            per_order_fee: Decimal::new(30, 2),
            auto_accept_pct: Decimal::new(95, 0),
            auto_decline_pct: Decimal::new(75, 0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdEvaluation {
    pub meets_threshold: bool,
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfitBreakdown {
    pub fees: Decimal,
    pub profit: Decimal,
    pub margin_pct: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BestOfferThresholds {
    pub auto_accept: Decimal,
    pub auto_decline: Decimal,
}

const CHARM_FLOOR: Decimal = Decimal::from_parts(99, 0, 0, false, 2);

/// Rounds to whole pence, halves away from zero.
pub(crate) fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn percent_of(value: Decimal, pct: Decimal) -> Decimal {
    value * pct / Decimal::ONE_HUNDRED
}

/// Rounds `price` to the nearest price ending in .49 or .99.
///
/// Anything at or below 0.99 becomes 0.99. Ties resolve to the higher price.
#[must_use]
pub fn round_to_charm_price(price: Decimal) -> Decimal {
    if price <= CHARM_FLOOR {
        return CHARM_FLOOR;
    }

    let whole = price.floor();
    let candidates = [
        whole - Decimal::new(1, 2),
        whole + Decimal::new(49, 2),
        whole + Decimal::new(99, 2),
    ];

    let mut best = candidates[0];
    for candidate in candidates {
        if (candidate - price).abs() <= (best - price).abs() {
            best = candidate;
        }
    }
    best.max(CHARM_FLOOR)
}

/// Recommended eBay list price for a minifig.
///
/// Uses the eBay average sold price when enough sales back it, otherwise the
/// BrickLink average sold price plus the configured markup. Returns `None`
/// when no market price is known.
#[must_use]
pub fn calculate_recommended_price(
    market: &MinifigMarketData,
    cfg: &PricingConfig,
) -> Option<Decimal> {
    let trusted_ebay = market
        .ebay_avg_sold
        .filter(|_| market.ebay_sold_count >= cfg.min_sold_count);

    let base = trusted_ebay
        .or_else(|| {
            market
                .bricklink_avg_sold
                .map(|bl| bl + percent_of(bl, cfg.bricklink_markup_pct))
        })
        .or(market.ebay_avg_sold)?;

    Some(round_to_charm_price(base.max(cfg.min_list_price)))
}

/// Checks whether a minifig is worth listing. Every failed rule adds a reason.
#[must_use]
pub fn evaluate_thresholds(market: &MinifigMarketData, cfg: &PricingConfig) -> ThresholdEvaluation {
    let mut reasons = Vec::new();

    let Some(avg_sold) = market.ebay_avg_sold.or(market.bricklink_avg_sold) else {
        return ThresholdEvaluation {
            meets_threshold: false,
            reasons: vec!["no market data".to_string()],
        };
    };

    if market.ebay_sold_count < cfg.min_sold_count {
        reasons.push(format!(
            "eBay sold count {} below minimum {}",
            market.ebay_sold_count, cfg.min_sold_count
        ));
    }

    if let Some(sell_through) = market.ebay_sell_through_pct {
        if sell_through < cfg.min_sell_through_pct {
            reasons.push(format!(
                "sell-through {sell_through}% below minimum {}%",
                cfg.min_sell_through_pct
            ));
        }
    }

    if avg_sold < cfg.min_avg_sold_price {
        reasons.push(format!(
            "average sold price £{avg_sold} below minimum £{}",
            cfg.min_avg_sold_price
        ));
    }

    ThresholdEvaluation {
        meets_threshold: reasons.is_empty(),
        reasons,
    }
}

/// Profit on an eBay sale after final value fee and per-order fee.
#[must_use]
pub fn calculate_profit(
    sale_price: Decimal,
    cost: Decimal,
    postage: Decimal,
    cfg: &PricingConfig,
) -> ProfitBreakdown {
    if sale_price <= Decimal::ZERO {
        return ProfitBreakdown {
            fees: Decimal::ZERO,
            profit: -(cost + postage),
            margin_pct: Decimal::ZERO,
        };
    }

    let fees = round_money(percent_of(sale_price, cfg.final_value_fee_pct) + cfg.per_order_fee);
    let profit = sale_price - fees - cost - postage;
    let margin_pct = round_money(profit / sale_price * Decimal::ONE_HUNDRED);

    ProfitBreakdown {
        fees,
        profit,
        margin_pct,
    }
}

/// Best Offer auto-accept and auto-decline levels for a listing price.
///
/// Returns `None` for non-positive prices, where no offer band exists.
#[must_use]
pub fn calculate_best_offer_thresholds(
    price: Decimal,
    cfg: &PricingConfig,
) -> Option<BestOfferThresholds> {
    if price <= Decimal::ZERO {
        return None;
    }

    let auto_accept = round_money(percent_of(price, cfg.auto_accept_pct));
    let mut auto_decline = round_money(percent_of(price, cfg.auto_decline_pct));
    if auto_decline >= auto_accept {
        auto_decline = auto_accept - Decimal::new(1, 2);
    }

    Some(BestOfferThresholds {
        auto_accept,
        auto_decline: auto_decline.max(Decimal::ZERO),
    })
}
