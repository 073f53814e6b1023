use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{Datelike, Months, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::middleware::{RequestId, Tenant};

use super::{map_db_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct ProfitLossQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub(super) struct ProfitLossMonth {
    month: NaiveDate,
    items_sold: i64,
    revenue: Decimal,
    cost_of_goods: Decimal,
    platform_fees: Decimal,
    purchase_spend: Decimal,
    gross_profit: Decimal,
}

#[derive(Debug, Serialize)]
pub(super) struct ProfitLossReport {
    from: NaiveDate,
    to: NaiveDate,
    months: Vec<ProfitLossMonth>,
    total_revenue: Decimal,
    total_gross_profit: Decimal,
}

/// The twelve whole months before the current one, plus the current month:
/// `from` is inclusive, `to` is the first day of next month (exclusive).
fn default_range(today: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
    let month_start = today.with_day(1)?;
    let to = month_start.checked_add_months(Months::new(1))?;
    let from = to.checked_sub_months(Months::new(12))?;
    Some((from, to))
}

pub(super) async fn profit_and_loss(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(Tenant(user_id)): Extension<Tenant>,
    Query(query): Query<ProfitLossQuery>,
) -> Result<Json<ApiResponse<ProfitLossReport>>, ApiError> {
    let Some((default_from, default_to)) = default_range(Utc::now().date_naive()) else {
        return Err(ApiError::new(req_id.0, "internal_error", "date out of range"));
    };
    let from = query.from.unwrap_or(default_from);
    let to = query.to.unwrap_or(default_to);

    let rows = brickdesk_db::profit_and_loss(&state.pool, user_id, from, to)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let total_revenue = rows.iter().map(|r| r.revenue).sum();
    let total_gross_profit = rows.iter().map(|r| r.gross_profit).sum();
    let months = rows
        .into_iter()
        .map(|row| ProfitLossMonth {
            month: row.month,
            items_sold: row.items_sold,
            revenue: row.revenue,
            cost_of_goods: row.cost_of_goods,
            platform_fees: row.platform_fees,
            purchase_spend: row.purchase_spend,
            gross_profit: row.gross_profit,
        })
        .collect();

    Ok(Json(ApiResponse::new(
        ProfitLossReport {
            from,
            to,
            months,
            total_revenue,
            total_gross_profit,
        },
        req_id.0,
    )))
}
