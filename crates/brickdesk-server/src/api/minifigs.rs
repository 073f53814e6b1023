use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use brickdesk_core::MinifigMarketData;
use brickdesk_db::MinifigSyncRow;
use brickdesk_sync::SyncError;

use crate::middleware::{RequestId, Tenant};

use super::{map_sync_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct StageRequest {
    /// Fresh market figures; the stored ones are reused when omitted.
    pub market: Option<MinifigMarketData>,
    pub ebay_offer_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct MinifigListing {
    id: i64,
    bricqer_item_id: String,
    bricklink_id: Option<String>,
    name: String,
    listing_status: String,
    meets_threshold: Option<bool>,
    recommended_price: Option<Decimal>,
    best_offer_auto_accept: Option<Decimal>,
    best_offer_auto_decline: Option<Decimal>,
    ebay_offer_id: Option<String>,
    ebay_listing_id: Option<String>,
    last_error: Option<String>,
    published_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
}

impl From<MinifigSyncRow> for MinifigListing {
    fn from(row: MinifigSyncRow) -> Self {
        Self {
            id: row.id,
            bricqer_item_id: row.bricqer_item_id,
            bricklink_id: row.bricklink_id,
            name: row.name,
            listing_status: row.listing_status,
            meets_threshold: row.meets_threshold,
            recommended_price: row.recommended_price,
            best_offer_auto_accept: row.best_offer_auto_accept,
            best_offer_auto_decline: row.best_offer_auto_decline,
            ebay_offer_id: row.ebay_offer_id,
            ebay_listing_id: row.ebay_listing_id,
            last_error: row.last_error,
            published_at: row.published_at,
            updated_at: row.updated_at,
        }
    }
}

pub(super) async fn stage(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(Tenant(user_id)): Extension<Tenant>,
    Path(id): Path<i64>,
    Json(body): Json<StageRequest>,
) -> Result<Json<ApiResponse<MinifigListing>>, ApiError> {
    let market = match body.market {
        Some(market) => market,
        None => brickdesk_db::get_minifig_item(&state.pool, user_id, id)
            .await
            .map_err(|e| map_sync_error(req_id.0.clone(), &SyncError::Db(e)))?
            .market_data(),
    };

    let row = brickdesk_sync::stage_listing(
        &state.pool,
        user_id,
        id,
        market,
        body.ebay_offer_id,
        &state.pricing,
    )
    .await
    .map_err(|e| map_sync_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::new(MinifigListing::from(row), req_id.0)))
}

pub(super) async fn publish(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(Tenant(user_id)): Extension<Tenant>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<MinifigListing>>, ApiError> {
    let Some(publisher) = state.publisher.as_deref() else {
        return Err(map_sync_error(req_id.0, &SyncError::NotConfigured("eBay")));
    };

    let row = brickdesk_sync::publish_staged_listing(&state.pool, publisher, user_id, id)
        .await
        .map_err(|e| map_sync_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::new(MinifigListing::from(row), req_id.0)))
}
