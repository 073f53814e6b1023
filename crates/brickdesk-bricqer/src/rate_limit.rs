//! Minimum spacing between outbound requests.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Enforces a minimum interval between request starts.
///
/// Clones share the same clock, so every task using one client draws from a
/// single budget. The lock is held while sleeping, which queues callers in
/// arrival order.
#[derive(Debug, Clone)]
pub struct RequestSpacer {
    min_interval: Duration,
    last_request: Arc<Mutex<Option<Instant>>>,
}

impl RequestSpacer {
    #[must_use]
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: Arc::new(Mutex::new(None)),
        }
    }

    #[must_use]
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Waits until at least `min_interval` has passed since the previous call
    /// returned, then records the new start time.
    pub async fn wait(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                let remaining = self.min_interval - elapsed;
                tracing::debug!(
                    wait_ms = u64::try_from(remaining.as_millis()).unwrap_or(u64::MAX),
                    "spacing Bricqer request"
                );
                tokio::time::sleep(remaining).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_request_is_immediate() {
        let spacer = RequestSpacer::new(Duration::from_secs(5));
        let started = Instant::now();
        spacer.wait().await;
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn consecutive_requests_are_spaced() {
        let spacer = RequestSpacer::new(Duration::from_millis(60));
        let started = Instant::now();
        spacer.wait().await;
        spacer.wait().await;
        spacer.wait().await;
        assert!(
            started.elapsed() >= Duration::from_millis(120),
            "three requests need two full intervals, took {:?}",
            started.elapsed()
        );
    }

    #[tokio::test]
    async fn clones_share_the_same_clock() {
        let spacer = RequestSpacer::new(Duration::from_millis(60));
        let other = spacer.clone();
        let started = Instant::now();

        let a = tokio::spawn({
            let s = spacer.clone();
            async move { s.wait().await }
        });
        let b = tokio::spawn(async move { other.wait().await });
        a.await.unwrap();
        b.await.unwrap();

        assert!(started.elapsed() >= Duration::from_millis(60));
    }
}
