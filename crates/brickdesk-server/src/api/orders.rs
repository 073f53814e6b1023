use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use brickdesk_core::{OrderStatus, Platform};
use brickdesk_db::OrderFilters;

use crate::middleware::{RequestId, Tenant};

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct OrdersQuery {
    pub platform: Option<String>,
    pub status: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct OrderItem {
    id: i64,
    platform: String,
    platform_order_id: String,
    status: String,
    order_date: DateTime<Utc>,
    buyer_name: Option<String>,
    item_count: i32,
    subtotal: Decimal,
    shipping: Decimal,
    fees: Decimal,
    total: Decimal,
    currency: String,
}

pub(super) async fn list_orders(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(Tenant(user_id)): Extension<Tenant>,
    Query(query): Query<OrdersQuery>,
) -> Result<Json<ApiResponse<Vec<OrderItem>>>, ApiError> {
    let invalid = |e: brickdesk_core::UnknownStatus| {
        ApiError::new(req_id.0.clone(), "validation_error", e.to_string())
    };
    let platform = query
        .platform
        .as_deref()
        .map(str::parse::<Platform>)
        .transpose()
        .map_err(invalid)?;
    let status = query
        .status
        .as_deref()
        .map(str::parse::<OrderStatus>)
        .transpose()
        .map_err(invalid)?;

    let filters = OrderFilters {
        platform,
        status,
        limit: normalize_limit(query.limit),
    };
    let rows = brickdesk_db::list_platform_orders(&state.pool, user_id, filters)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows
        .into_iter()
        .map(|row| OrderItem {
            id: row.id,
            platform: row.platform,
            platform_order_id: row.platform_order_id,
            status: row.status,
            order_date: row.order_date,
            buyer_name: row.buyer_name,
            item_count: row.item_count,
            subtotal: row.subtotal,
            shipping: row.shipping,
            fees: row.fees,
            total: row.total,
            currency: row.currency,
        })
        .collect();

    Ok(Json(ApiResponse::new(data, req_id.0)))
}
