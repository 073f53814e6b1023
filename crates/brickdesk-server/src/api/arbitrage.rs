use axum::{
    extract::{Query, State},
    Extension, Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use brickdesk_core::{evaluate_arbitrage, ArbitrageConfig, ArbitrageResult};
use brickdesk_db::ArbitrageCandidateRow;

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState};

/// Largest batch accepted by one source-price import.
const MAX_SOURCE_PRICE_BATCH: usize = 500;

#[derive(Debug, Deserialize)]
pub(super) struct ArbitrageQuery {
    pub limit: Option<i64>,
    /// Include sets below the margin threshold.
    #[serde(default)]
    pub all: bool,
}

#[derive(Debug, Serialize)]
pub(super) struct ArbitrageItem {
    set_number: String,
    set_name: String,
    asin: String,
    uk_retail_price: Option<Decimal>,
    #[serde(flatten)]
    result: ArbitrageResult,
}

/// Evaluates every candidate and orders by margin, best first.
fn rank(rows: Vec<ArbitrageCandidateRow>, cfg: &ArbitrageConfig, all: bool) -> Vec<ArbitrageItem> {
    let mut items: Vec<ArbitrageItem> = rows
        .into_iter()
        .filter_map(|row| {
            let result = evaluate_arbitrage(&row.prices(), cfg)?;
            (all || result.is_opportunity).then(|| ArbitrageItem {
                set_number: row.set_number,
                set_name: row.set_name,
                asin: row.asin,
                uk_retail_price: row.uk_retail_price,
                result,
            })
        })
        .collect();
    items.sort_by(|a, b| b.result.margin_pct.cmp(&a.result.margin_pct));
    items
}

pub(super) async fn list_opportunities(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ArbitrageQuery>,
) -> Result<Json<ApiResponse<Vec<ArbitrageItem>>>, ApiError> {
    let rows = brickdesk_db::list_arbitrage_candidates(&state.pool, normalize_limit(query.limit))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rank(rows, &state.arbitrage, query.all);
    Ok(Json(ApiResponse::new(data, req_id.0)))
}

#[derive(Debug, Deserialize)]
pub(super) struct SourcePrice {
    pub set_number: String,
    pub bricklink_min_price: Option<Decimal>,
    pub ebay_min_price: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub(super) struct SourcePricesRequest {
    pub prices: Vec<SourcePrice>,
}

#[derive(Debug, Serialize)]
pub(super) struct SourcePricesResult {
    updated: usize,
    /// Set numbers with no seeded Amazon pricing row.
    unknown_sets: Vec<String>,
}

/// Records the cheapest BrickLink / eBay listings for seeded sets.
pub(super) async fn import_source_prices(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<SourcePricesRequest>,
) -> Result<Json<ApiResponse<SourcePricesResult>>, ApiError> {
    if body.prices.len() > MAX_SOURCE_PRICE_BATCH {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            format!("at most {MAX_SOURCE_PRICE_BATCH} prices per request"),
        ));
    }

    let mut result = SourcePricesResult {
        updated: 0,
        unknown_sets: Vec::new(),
    };
    for price in body.prices {
        let set_number = price.set_number.trim();
        if set_number.is_empty() {
            return Err(ApiError::new(
                req_id.0,
                "validation_error",
                "set_number must not be empty",
            ));
        }
        let found = brickdesk_db::update_source_prices(
            &state.pool,
            set_number,
            price.bricklink_min_price,
            price.ebay_min_price,
        )
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
        if found {
            result.updated += 1;
        } else {
            result.unknown_sets.push(set_number.to_owned());
        }
    }

    tracing::info!(
        updated = result.updated,
        unknown = result.unknown_sets.len(),
        "source prices imported"
    );
    Ok(Json(ApiResponse::new(result, req_id.0)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(set_number: &str, amazon: i64, bricklink: Option<i64>) -> ArbitrageCandidateRow {
        ArbitrageCandidateRow {
            set_number: set_number.to_owned(),
            set_name: format!("Set {set_number}"),
            asin: format!("ASIN{set_number}"),
            uk_retail_price: None,
            amazon_price: Some(Decimal::new(amazon, 2)),
            bricklink_min_price: bricklink.map(|p| Decimal::new(p, 2)),
            ebay_min_price: None,
        }
    }

    #[test]
    fn rank_orders_by_margin_and_drops_unpriced_rows() {
        let rows = vec![
            row("10001-1", 10_000, Some(6_000)),
            row("10002-1", 10_000, Some(3_000)),
            row("10003-1", 10_000, None),
        ];

        let items = rank(rows, &ArbitrageConfig::default(), true);

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].set_number, "10002-1");
        assert!(items[0].result.margin_pct > items[1].result.margin_pct);
    }

    #[test]
    fn rank_hides_thin_margins_unless_asked() {
        let rows = vec![row("10004-1", 10_000, Some(9_500))];
        assert!(rank(rows.clone(), &ArbitrageConfig::default(), false).is_empty());
        assert_eq!(rank(rows, &ArbitrageConfig::default(), true).len(), 1);
    }
}
