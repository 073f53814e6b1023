use axum::{extract::State, http::StatusCode, Extension, Json};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use brickdesk_db::{NewInventoryItem, NewPurchase};

use crate::middleware::{RequestId, Tenant};

use super::{inventory::InventoryItem, map_db_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct CreatePurchaseRequest {
    pub purchase: NewPurchase,
    #[serde(default)]
    pub items: Vec<NewInventoryItem>,
}

#[derive(Debug, Serialize)]
pub(super) struct PurchaseItem {
    id: i64,
    purchase_date: NaiveDate,
    source: String,
    description: Option<String>,
    total_cost: Decimal,
    payment_method: Option<String>,
    created_at: DateTime<Utc>,
    items: Vec<InventoryItem>,
}

pub(super) async fn create_purchase(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(Tenant(user_id)): Extension<Tenant>,
    Json(body): Json<CreatePurchaseRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PurchaseItem>>), ApiError> {
    let created =
        brickdesk_db::create_purchase_with_items(&state.pool, user_id, &body.purchase, &body.items)
            .await
            .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let purchase = created.purchase;
    tracing::info!(
        purchase_id = purchase.id,
        items = created.items.len(),
        "purchase recorded"
    );

    let data = PurchaseItem {
        id: purchase.id,
        purchase_date: purchase.purchase_date,
        source: purchase.source,
        description: purchase.description,
        total_cost: purchase.total_cost,
        payment_method: purchase.payment_method,
        created_at: purchase.created_at,
        items: created.items.into_iter().map(InventoryItem::from).collect(),
    };

    Ok((StatusCode::CREATED, Json(ApiResponse::new(data, req_id.0))))
}
