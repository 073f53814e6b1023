use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use brickdesk_core::InventoryStatus;
use brickdesk_db::{InventoryFilters, InventoryItemRow, TransitionDetails};

use crate::middleware::{RequestId, Tenant};

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct InventoryQuery {
    pub status: Option<String>,
    pub set_number: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct InventoryItem {
    id: i64,
    purchase_id: Option<i64>,
    set_number: String,
    item_name: Option<String>,
    condition: String,
    status: String,
    cost: Decimal,
    sku: Option<String>,
    listing_platform: Option<String>,
    listing_price: Option<Decimal>,
    sold_price: Option<Decimal>,
    sold_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<InventoryItemRow> for InventoryItem {
    fn from(row: InventoryItemRow) -> Self {
        Self {
            id: row.id,
            purchase_id: row.purchase_id,
            set_number: row.set_number,
            item_name: row.item_name,
            condition: row.condition,
            status: row.status,
            cost: row.cost,
            sku: row.sku,
            listing_platform: row.listing_platform,
            listing_price: row.listing_price,
            sold_price: row.sold_price,
            sold_at: row.sold_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct TransitionRequest {
    pub status: String,
    pub listing_platform: Option<String>,
    pub listing_price: Option<Decimal>,
    pub sold_price: Option<Decimal>,
}

fn parse_status(request_id: &str, raw: &str) -> Result<InventoryStatus, ApiError> {
    raw.parse::<InventoryStatus>()
        .map_err(|e| ApiError::new(request_id, "validation_error", e.to_string()))
}

pub(super) async fn list_inventory(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(Tenant(user_id)): Extension<Tenant>,
    Query(query): Query<InventoryQuery>,
) -> Result<Json<ApiResponse<Vec<InventoryItem>>>, ApiError> {
    let status = query
        .status
        .as_deref()
        .map(|s| parse_status(&req_id.0, s))
        .transpose()?;

    let filters = InventoryFilters {
        status,
        set_number: query.set_number.as_deref(),
        limit: normalize_limit(query.limit),
    };
    let rows = brickdesk_db::list_inventory(&state.pool, user_id, filters)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows.into_iter().map(InventoryItem::from).collect();
    Ok(Json(ApiResponse::new(data, req_id.0)))
}

pub(super) async fn transition_status(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(Tenant(user_id)): Extension<Tenant>,
    Path(id): Path<i64>,
    Json(body): Json<TransitionRequest>,
) -> Result<Json<ApiResponse<InventoryItem>>, ApiError> {
    let next = parse_status(&req_id.0, &body.status)?;
    if next == InventoryStatus::Listed && body.listing_platform.is_none() {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "listing_platform is required when listing an item",
        ));
    }

    let details = TransitionDetails {
        listing_platform: body.listing_platform,
        listing_price: body.listing_price,
        sold_price: body.sold_price,
    };
    let row = brickdesk_db::transition_inventory_status(&state.pool, user_id, id, next, &details)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    tracing::info!(id, status = %row.status, "inventory item transitioned");
    Ok(Json(ApiResponse::new(InventoryItem::from(row), req_id.0)))
}
