mod arbitrage;
mod discovery;
mod inventory;
mod minifigs;
mod orders;
mod purchases;
mod reports;
mod sync;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use brickdesk_core::{AppConfig, ArbitrageConfig, PricingConfig};
use brickdesk_db::DbError;
use brickdesk_keepa::{KeepaClient, ProductSource};
use brickdesk_marketplaces::{EbayClient, ListingPublisher};
use brickdesk_sync::SyncError;

use crate::middleware::{
    enforce_rate_limit, request_id, require_bearer_auth, AuthState, RateLimitState, RequestId,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<AppConfig>,
    pub pricing: PricingConfig,
    pub arbitrage: ArbitrageConfig,
    /// eBay offer publisher; `None` when eBay is not configured.
    pub publisher: Option<Arc<dyn ListingPublisher>>,
    /// Keepa product lookups for ASIN discovery; `None` without a Keepa key.
    pub products: Option<Arc<dyn ProductSource>>,
}

impl AppState {
    /// Builds the state and the marketplace clients whose credentials are
    /// present in `config`.
    ///
    /// # Errors
    ///
    /// Fails if a configured client cannot be constructed (bad base URL or
    /// HTTP client setup).
    pub fn from_config(pool: PgPool, config: Arc<AppConfig>) -> anyhow::Result<Self> {
        let publisher: Option<Arc<dyn ListingPublisher>> = match &config.ebay {
            Some(ebay) => Some(Arc::new(EbayClient::from_config(ebay, &config.http)?)),
            None => None,
        };
        let products: Option<Arc<dyn ProductSource>> = match &config.keepa {
            Some(keepa) => Some(Arc::new(KeepaClient::from_config(keepa, &config.http)?)),
            None => None,
        };

        Ok(Self {
            pool,
            config,
            pricing: PricingConfig::default(),
            arbitrage: ArbitrageConfig::default(),
            publisher,
            products,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub(super) fn new(data: T, request_id: String) -> Self {
        Self {
            data,
            meta: ResponseMeta::new(request_id),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            "upstream_error" => StatusCode::BAD_GATEWAY,
            "not_configured" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn normalize_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(50).clamp(1, 200)
}

pub(super) fn map_db_error(request_id: String, error: &DbError) -> ApiError {
    match error {
        DbError::NotFound => ApiError::new(request_id, "not_found", "record not found"),
        DbError::InvalidInventoryTransition { .. }
        | DbError::InvalidSyncRunTransition { .. }
        | DbError::ListingStateConflict { .. } => {
            ApiError::new(request_id, "conflict", error.to_string())
        }
        DbError::InvalidInput { .. } => {
            ApiError::new(request_id, "validation_error", error.to_string())
        }
        _ => {
            tracing::error!(error = %error, "database query failed");
            ApiError::new(request_id, "internal_error", "database query failed")
        }
    }
}

pub(super) fn map_sync_error(request_id: String, error: &SyncError) -> ApiError {
    match error {
        SyncError::Db(db) => map_db_error(request_id, db),
        SyncError::Conflict(message) => ApiError::new(request_id, "conflict", message.clone()),
        SyncError::Validation { .. } => {
            ApiError::new(request_id, "validation_error", error.to_string())
        }
        SyncError::NotConfigured(_) => {
            ApiError::new(request_id, "not_configured", error.to_string())
        }
        SyncError::Bricqer(_)
        | SyncError::Keepa(_)
        | SyncError::Marketplace(_)
        | SyncError::Http(_)
        | SyncError::Notify { .. } => {
            tracing::warn!(error = %error, "upstream call failed");
            ApiError::new(request_id, "upstream_error", error.to_string())
        }
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
}

fn protected_router(auth: AuthState, rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route("/api/v1/inventory", get(inventory::list_inventory))
        .route(
            "/api/v1/inventory/{id}/status",
            post(inventory::transition_status),
        )
        .route("/api/v1/purchases", post(purchases::create_purchase))
        .route("/api/v1/orders", get(orders::list_orders))
        .route(
            "/api/v1/reports/profit-loss",
            get(reports::profit_and_loss),
        )
        .route("/api/v1/arbitrage", get(arbitrage::list_opportunities))
        .route(
            "/api/v1/arbitrage/source-prices",
            post(arbitrage::import_source_prices),
        )
        .route("/api/v1/minifigs/{id}/stage", post(minifigs::stage))
        .route("/api/v1/minifigs/{id}/publish", post(minifigs::publish))
        .route("/api/v1/sync/full", post(sync::trigger_full_sync))
        .route("/api/v1/sync/runs", get(sync::list_runs))
        .route("/api/v1/asin-discovery", post(discovery::run_page))
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(
                    rate_limit,
                    enforce_rate_limit,
                ))
                .layer(axum::middleware::from_fn_with_state(
                    auth,
                    require_bearer_auth,
                )),
        )
}

pub fn build_app(state: AppState, auth: AuthState, rate_limit: RateLimitState) -> Router {
    let public_routes = Router::new().route("/api/v1/health", get(health));

    Router::new()
        .merge(public_routes)
        .merge(protected_router(auth, rate_limit))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    match brickdesk_db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse::new(
                HealthData {
                    status: "ok",
                    database: "ok",
                },
                req_id.0,
            )),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse::new(
                    HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                    req_id.0,
                )),
            )
        }
    }
}

pub fn default_rate_limit_state() -> RateLimitState {
    RateLimitState::new(120, Duration::from_secs(60))
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
