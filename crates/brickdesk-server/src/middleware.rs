use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use subtle::ConstantTimeEq;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Newtype wrapping a request ID string, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// The tenant a request acts for, resolved from its bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tenant(pub Uuid);

/// Bearer token → tenant mapping used by the auth middleware.
#[derive(Debug, Clone)]
pub struct AuthState {
    tokens: Arc<Vec<(String, Uuid)>>,
    dev_user_id: Uuid,
    pub enabled: bool,
}

impl AuthState {
    /// Reads `BRICKDESK_API_KEYS` (comma-separated `token:tenant-uuid`) and
    /// `BRICKDESK_DEV_USER_ID`.
    ///
    /// # Errors
    ///
    /// See [`AuthState::parse`].
    pub fn from_env(is_development: bool) -> anyhow::Result<Self> {
        let keys = std::env::var("BRICKDESK_API_KEYS").unwrap_or_default();
        let dev_user = std::env::var("BRICKDESK_DEV_USER_ID").ok();
        Self::parse(&keys, dev_user.as_deref(), is_development)
    }

    /// Without any keys, auth is disabled in development and every request
    /// acts as the dev tenant; elsewhere startup fails.
    ///
    /// # Errors
    ///
    /// Fails on a malformed pair, a bad tenant UUID, or missing keys outside
    /// development.
    pub fn parse(raw: &str, dev_user_id: Option<&str>, is_development: bool) -> anyhow::Result<Self> {
        let mut tokens = Vec::new();
        for pair in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let Some((token, tenant)) = pair.split_once(':') else {
                anyhow::bail!("BRICKDESK_API_KEYS entries must look like token:tenant-uuid");
            };
            let token = token.trim();
            if token.is_empty() {
                anyhow::bail!("BRICKDESK_API_KEYS contains an empty token");
            }
            let tenant = Uuid::parse_str(tenant.trim())
                .map_err(|e| anyhow::anyhow!("invalid tenant id for API key: {e}"))?;
            tokens.push((token.to_owned(), tenant));
        }

        let dev_user_id = match dev_user_id.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => Uuid::parse_str(raw)
                .map_err(|e| anyhow::anyhow!("BRICKDESK_DEV_USER_ID is not a UUID: {e}"))?,
            None => Uuid::nil(),
        };

        if tokens.is_empty() {
            if is_development {
                tracing::warn!(
                    %dev_user_id,
                    "BRICKDESK_API_KEYS not set; bearer auth disabled in development environment"
                );
                return Ok(Self {
                    tokens: Arc::new(Vec::new()),
                    dev_user_id,
                    enabled: false,
                });
            }

            anyhow::bail!(
                "BRICKDESK_API_KEYS is required outside development; provide comma-separated token:tenant-uuid pairs"
            );
        }

        Ok(Self {
            tokens: Arc::new(tokens),
            dev_user_id,
            enabled: true,
        })
    }

    /// Every stored token is compared so timing does not reveal which
    /// prefix matched.
    fn tenant_for(&self, token: &str) -> Option<Uuid> {
        let mut found = None;
        for (known, tenant) in self.tokens.iter() {
            if bool::from(known.as_bytes().ct_eq(token.as_bytes())) {
                found = Some(*tenant);
            }
        }
        found
    }
}

#[derive(Debug, Clone)]
struct RateLimitWindow {
    started_at: Instant,
    count: usize,
}

/// Fixed-window limiter shared by all protected routes.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    max_requests: usize,
    window: Duration,
    state: Arc<Mutex<RateLimitWindow>>,
}

impl RateLimitState {
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            state: Arc::new(Mutex::new(RateLimitWindow {
                started_at: Instant::now(),
                count: 0,
            })),
        }
    }
}

#[derive(Debug, Serialize)]
struct MiddlewareErrorBody {
    error: MiddlewareError,
}

#[derive(Debug, Serialize)]
struct MiddlewareError {
    code: &'static str,
    message: &'static str,
}

fn reject(status: StatusCode, code: &'static str, message: &'static str) -> Response {
    (
        status,
        Json(MiddlewareErrorBody {
            error: MiddlewareError { code, message },
        }),
    )
        .into_response()
}

/// Uses the incoming `x-request-id` or generates one, stores it as a
/// [`RequestId`] extension and echoes it on the response.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert("x-request-id", val);
    }

    res
}

/// Resolves the bearer token to a [`Tenant`] extension, or rejects with 401.
pub async fn require_bearer_auth(
    State(auth): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Response {
    if !auth.enabled {
        req.extensions_mut().insert(Tenant(auth.dev_user_id));
        return next.run(req).await;
    }

    let tenant = extract_bearer_token(req.headers().get(AUTHORIZATION))
        .and_then(|token| auth.tenant_for(token));

    match tenant {
        Some(tenant) => {
            req.extensions_mut().insert(Tenant(tenant));
            next.run(req).await
        }
        None => reject(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "missing or invalid bearer token",
        ),
    }
}

pub async fn enforce_rate_limit(
    State(rate_limit): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    let mut window = rate_limit.state.lock().await;

    if window.started_at.elapsed() >= rate_limit.window {
        window.started_at = Instant::now();
        window.count = 0;
    }

    if window.count >= rate_limit.max_requests {
        return reject(
            StatusCode::TOO_MANY_REQUESTS,
            "rate_limited",
            "rate limit exceeded",
        );
    }

    window.count += 1;
    drop(window);

    next.run(req).await
}

fn extract_bearer_token(value: Option<&HeaderValue>) -> Option<&str> {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
