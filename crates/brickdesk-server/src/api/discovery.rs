use std::time::Duration;

use axum::{extract::State, Extension, Json};
use serde::Deserialize;
use tokio::time::Instant;

use brickdesk_sync::{DiscoveryPageReport, SyncError};

use crate::middleware::RequestId;

use super::{map_sync_error, ApiError, ApiResponse, AppState};

const DEFAULT_PAGE_SIZE: i64 = 25;
const MAX_PAGE_SIZE: i64 = 200;
const DEFAULT_TIME_BUDGET_SECS: u64 = 25;
const MAX_TIME_BUDGET_SECS: u64 = 55;

#[derive(Debug, Default, Deserialize)]
pub(super) struct DiscoveryRequest {
    pub offset: Option<i64>,
    pub limit: Option<i64>,
    pub time_budget_secs: Option<u64>,
}

fn time_budget(requested: Option<u64>) -> Duration {
    Duration::from_secs(
        requested
            .unwrap_or(DEFAULT_TIME_BUDGET_SECS)
            .clamp(1, MAX_TIME_BUDGET_SECS),
    )
}

/// One page of ASIN discovery. Callers keep posting `next_offset` until it
/// comes back `null`.
pub(super) async fn run_page(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Option<Json<DiscoveryRequest>>,
) -> Result<Json<ApiResponse<DiscoveryPageReport>>, ApiError> {
    let Some(source) = state.products.as_deref() else {
        return Err(map_sync_error(req_id.0, &SyncError::NotConfigured("Keepa")));
    };
    let Json(body) = body.unwrap_or_default();

    let offset = body.offset.unwrap_or(0);
    let limit = body.limit.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE);
    let deadline = Instant::now() + time_budget(body.time_budget_secs);

    let report = brickdesk_sync::run_discovery_page(&state.pool, source, offset, limit, deadline)
        .await
        .map_err(|e| map_sync_error(req_id.0.clone(), &e))?;

    tracing::info!(
        offset,
        processed = report.processed,
        found = report.found,
        next_offset = ?report.next_offset,
        "ASIN discovery page finished"
    );
    Ok(Json(ApiResponse::new(report, req_id.0)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_budget_is_capped() {
        assert_eq!(time_budget(None), Duration::from_secs(DEFAULT_TIME_BUDGET_SECS));
        assert_eq!(time_budget(Some(0)), Duration::from_secs(1));
        assert_eq!(time_budget(Some(600)), Duration::from_secs(MAX_TIME_BUDGET_SECS));
    }
}
