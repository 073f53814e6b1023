use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use brickdesk_sync::{FullSyncService, FullSyncSummary};

use crate::middleware::{RequestId, Tenant};

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct SyncRunsQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct SyncRunItem {
    sync_run_id: Uuid,
    job: String,
    trigger_source: String,
    status: String,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    records_processed: i32,
    error_message: Option<String>,
    created_at: DateTime<Utc>,
}

/// Runs every configured platform job for the caller and waits for the
/// summary.
pub(super) async fn trigger_full_sync(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(Tenant(user_id)): Extension<Tenant>,
) -> Result<Json<ApiResponse<FullSyncSummary>>, ApiError> {
    let internal = |e: anyhow::Error| {
        tracing::error!(error = %e, "full sync failed");
        ApiError::new(req_id.0.clone(), "internal_error", "full sync failed")
    };

    let service =
        FullSyncService::from_config(state.pool.clone(), &state.config, user_id).map_err(internal)?;
    tracing::info!(jobs = ?service.job_names(), "full sync requested");
    let summary = service.run("api").await.map_err(internal)?;

    Ok(Json(ApiResponse::new(summary, req_id.0)))
}

pub(super) async fn list_runs(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(Tenant(user_id)): Extension<Tenant>,
    Query(query): Query<SyncRunsQuery>,
) -> Result<Json<ApiResponse<Vec<SyncRunItem>>>, ApiError> {
    let rows = brickdesk_db::list_sync_runs(&state.pool, user_id, normalize_limit(query.limit))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows
        .into_iter()
        .map(|row| SyncRunItem {
            sync_run_id: row.public_id,
            job: row.job,
            trigger_source: row.trigger_source,
            status: row.status,
            started_at: row.started_at,
            completed_at: row.completed_at,
            records_processed: row.records_processed,
            error_message: row.error_message,
            created_at: row.created_at,
        })
        .collect();

    Ok(Json(ApiResponse::new(data, req_id.0)))
}
