//! Retry with exponential back-off and jitter for the Bricqer client.
//!
//! Rate limiting (429), 5xx responses, and network timeouts are transient and
//! retried. Every other 4xx and any decode failure is returned immediately.

use std::future::Future;
use std::time::Duration;

use crate::error::BricqerError;

const DEFAULT_MAX_DELAY_MS: u64 = 30_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first failure.
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_retries: u32, base_delay_ms: u64) -> Self {
        Self {
            max_retries,
            base_delay_ms,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
        }
    }

    /// Delay before retry number `attempt` (1-based), given a jitter factor
    /// in `[0.75, 1.25]`.
    ///
    /// `base × 2^(attempt-1)` scaled by jitter and capped at `max_delay_ms`.
    /// A server-supplied `Retry-After` raises the result to at least that
    /// many seconds, even past the cap.
    #[must_use]
    pub fn delay_for(&self, attempt: u32, jitter: f64, retry_after_secs: Option<u64>) -> Duration {
        let exponent = attempt.saturating_sub(1).min(20);
        let computed = self.base_delay_ms.saturating_mul(1u64 << exponent);

        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            clippy::cast_precision_loss
        )]
        let jittered = (computed as f64 * jitter.clamp(0.75, 1.25)) as u64;
        let capped = jittered.min(self.max_delay_ms);

        let floor = retry_after_secs.map_or(0, |s| s.saturating_mul(1_000));
        Duration::from_millis(capped.max(floor))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, 1_000)
    }
}

/// Returns `true` for errors that are worth retrying after a back-off delay.
pub(crate) fn is_retriable(err: &BricqerError) -> bool {
    match err {
        BricqerError::RateLimited { .. } | BricqerError::ServerError { .. } => true,
        BricqerError::Http(e) => {
            e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
        }
        BricqerError::Deserialize { .. }
        | BricqerError::NotFound { .. }
        | BricqerError::UnexpectedStatus { .. }
        | BricqerError::PaginationLimit { .. }
        | BricqerError::InvalidBaseUrl { .. }
        | BricqerError::Normalization { .. } => false,
    }
}

fn retry_after(err: &BricqerError) -> Option<u64> {
    match err {
        BricqerError::RateLimited { retry_after_secs } => *retry_after_secs,
        _ => None,
    }
}

/// Runs `operation` with up to `policy.max_retries` additional attempts on
/// transient errors.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    policy: RetryPolicy,
    mut operation: F,
) -> Result<T, BricqerError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, BricqerError>>,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= policy.max_retries {
                    return Err(err);
                }
                attempt += 1;
                let jitter = rand::random::<f64>() * 0.5 + 0.75;
                let delay = policy.delay_for(attempt, jitter, retry_after(&err));
                tracing::warn!(
                    attempt,
                    max_retries = policy.max_retries,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %err,
                    "Bricqer transient error, retrying after back-off"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
