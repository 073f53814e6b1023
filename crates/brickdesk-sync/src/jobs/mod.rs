//! Platform jobs run by the full sync.

mod amazon;
mod brickowl;
mod bricqer;
mod keepa_pricing;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

use brickdesk_bricqer::BricqerClient;
use brickdesk_core::AppConfig;
use brickdesk_keepa::KeepaClient;
use brickdesk_marketplaces::{BrickOwlClient, SpApiClient, TwoPhaseConfig};
use rust_decimal::Decimal;

use crate::full_sync::PlatformSync;

pub use amazon::{AmazonQueueJob, DEFAULT_CLAIM_LIMIT};
pub use brickowl::BrickOwlOrdersJob;
pub use bricqer::{BricqerInventoryJob, BricqerOrdersJob};
pub use keepa_pricing::{daily_buy_box_points, KeepaPricingJob};

/// Page cap for one Bricqer listing walk.
const BRICQER_MAX_PAGES: usize = 50;

/// Queue rows one scheduled Amazon run takes on.
pub const SCHEDULED_AMAZON_CLAIM_LIMIT: i64 = 20;

/// Feed polling and verification sized so a scheduled Amazon run of
/// [`SCHEDULED_AMAZON_CLAIM_LIMIT`] rows fits inside the default 60 second
/// per-job timeout: two feeds of at most 18s plus two verification rounds
/// of 6s.
#[must_use]
pub fn scheduled_two_phase_config() -> TwoPhaseConfig {
    TwoPhaseConfig {
        poll_interval: Duration::from_secs(3),
        max_polls: 6,
        verify_interval: Duration::from_secs(3),
        verify_attempts: 3,
        verify_concurrency: 10,
        price_tolerance: Decimal::new(5, 3),
    }
}

/// The Amazon job's own budget under a per-job timeout, leaving a tenth of
/// it to release claimed rows before the timeout cancels the job.
#[must_use]
pub fn amazon_job_budget(job_timeout: Duration) -> Duration {
    job_timeout * 9 / 10
}

/// Builds a job for every platform whose credentials are configured.
///
/// # Errors
///
/// Returns an error if a configured client cannot be constructed.
pub fn build_jobs(
    pool: &PgPool,
    config: &AppConfig,
    user_id: Uuid,
) -> anyhow::Result<Vec<Arc<dyn PlatformSync>>> {
    let mut jobs: Vec<Arc<dyn PlatformSync>> = Vec::new();

    if let Some(bricqer) = &config.bricqer {
        let client = BricqerClient::from_config(bricqer, &config.http)
            .context("failed to build Bricqer client")?;
        jobs.push(Arc::new(BricqerOrdersJob::new(
            pool.clone(),
            user_id,
            client.clone(),
            BRICQER_MAX_PAGES,
        )));
        jobs.push(Arc::new(BricqerInventoryJob::new(
            pool.clone(),
            user_id,
            client,
            BRICQER_MAX_PAGES,
        )));
    }

    if let Some(key) = &config.brickowl_api_key {
        let client =
            BrickOwlClient::new(key, &config.http).context("failed to build Brick Owl client")?;
        jobs.push(Arc::new(BrickOwlOrdersJob::new(pool.clone(), user_id, client)));
    }

    if let Some(amazon) = &config.amazon {
        let client = SpApiClient::from_config(amazon, &config.http)
            .context("failed to build SP-API client")?;
        let budget = amazon_job_budget(Duration::from_secs(config.sync_timeout_secs));
        jobs.push(Arc::new(
            AmazonQueueJob::new(
                pool.clone(),
                user_id,
                Arc::new(client),
                scheduled_two_phase_config(),
                budget,
            )
            .with_claim_limit(SCHEDULED_AMAZON_CLAIM_LIMIT),
        ));
    }

    if let Some(keepa) = &config.keepa {
        let client =
            KeepaClient::from_config(keepa, &config.http).context("failed to build Keepa client")?;
        jobs.push(Arc::new(KeepaPricingJob::new(pool.clone(), client)));
    }

    let names: Vec<&str> = jobs.iter().map(|j| j.name()).collect();
    tracing::info!(?names, "sync jobs configured");
    Ok(jobs)
}
