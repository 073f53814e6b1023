use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use brickdesk_marketplaces::{ListingsGateway, SyncItem, TwoPhaseConfig, TwoPhaseSync};

use crate::full_sync::PlatformSync;

/// Queue rows claimed per run unless overridden.
pub const DEFAULT_CLAIM_LIMIT: i64 = 100;

/// How long past the run budget a claim is honoured before other runs may
/// take the rows over.
const LEASE_GRACE: Duration = Duration::from_secs(60);

/// Drains pending `amazon_sync_queue` rows through the two-phase sync.
///
/// Claimed rows always end in one of three states: an outcome is recorded,
/// they are released back to `pending` (budget elapsed, or the run was
/// cancelled), or their lease lapses and the next run reclaims them.
pub struct AmazonQueueJob {
    pool: PgPool,
    user_id: Uuid,
    gateway: Arc<dyn ListingsGateway>,
    config: TwoPhaseConfig,
    budget: Duration,
    claim_limit: i64,
}

impl AmazonQueueJob {
    /// `budget` bounds one run end to end; when it elapses the claimed rows
    /// are released and the run fails.
    #[must_use]
    pub fn new(
        pool: PgPool,
        user_id: Uuid,
        gateway: Arc<dyn ListingsGateway>,
        config: TwoPhaseConfig,
        budget: Duration,
    ) -> Self {
        Self {
            pool,
            user_id,
            gateway,
            config,
            budget,
            claim_limit: DEFAULT_CLAIM_LIMIT,
        }
    }

    #[must_use]
    pub fn with_claim_limit(mut self, limit: i64) -> Self {
        self.claim_limit = limit.max(1);
        self
    }

    fn lease(&self) -> Duration {
        self.budget + LEASE_GRACE
    }
}

#[async_trait]
impl PlatformSync for AmazonQueueJob {
    fn name(&self) -> &'static str {
        "amazon-queue"
    }

    async fn run(&self) -> anyhow::Result<usize> {
        let rows = brickdesk_db::claim_pending_amazon_updates(
            &self.pool,
            self.user_id,
            self.claim_limit,
            self.lease(),
        )
        .await
        .context("claiming Amazon queue rows")?;
        if rows.is_empty() {
            tracing::debug!("Amazon queue empty");
            return Ok(0);
        }

        let mut claim = ClaimGuard {
            pool: self.pool.clone(),
            ids: rows.iter().map(|row| row.id).collect(),
        };
        let items: Vec<SyncItem> = rows
            .into_iter()
            .map(|row| SyncItem {
                id: row.id,
                sku: row.sku,
                price: row.price,
                quantity: row.quantity,
            })
            .collect();

        let sync = TwoPhaseSync::new(self.gateway.as_ref(), self.config);
        let Ok(results) = tokio::time::timeout(self.budget, sync.run(items)).await else {
            let ids = claim.disarm();
            let released = brickdesk_db::release_amazon_claims(&self.pool, &ids)
                .await
                .context("releasing Amazon queue claims")?;
            anyhow::bail!(
                "Amazon sync exceeded its {}s budget; {released} queued update(s) released for the next run",
                self.budget.as_secs()
            );
        };

        for result in &results {
            let error = result.outcome.error_message();
            brickdesk_db::record_amazon_outcome(
                &self.pool,
                result.id,
                result.outcome.is_success(),
                result.outcome.as_str(),
                error.as_deref(),
            )
            .await
            .with_context(|| format!("recording outcome for queue row {}", result.id))?;
        }
        claim.disarm();

        Ok(results.len())
    }
}

/// Hands claimed rows back to `pending` when the run future is dropped before
/// it finished with them, e.g. by the full sync's per-job timeout.
struct ClaimGuard {
    pool: PgPool,
    ids: Vec<i64>,
}

impl ClaimGuard {
    fn disarm(&mut self) -> Vec<i64> {
        std::mem::take(&mut self.ids)
    }
}

impl Drop for ClaimGuard {
    fn drop(&mut self) {
        let ids = self.disarm();
        if ids.is_empty() {
            return;
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(rows = ids.len(), "no runtime to release Amazon queue claims");
            return;
        };
        let pool = self.pool.clone();
        runtime.spawn(async move {
            match brickdesk_db::release_amazon_claims(&pool, &ids).await {
                Ok(released) => {
                    tracing::warn!(released, "Amazon sync cancelled, queue claims released");
                }
                Err(e) => tracing::error!(
                    error = %e,
                    rows = ids.len(),
                    "failed to release Amazon queue claims, they return after the lease"
                ),
            }
        });
    }
}
