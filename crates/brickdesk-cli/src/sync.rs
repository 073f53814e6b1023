//! Sync command handlers.

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use brickdesk_core::AppConfig;
use brickdesk_marketplaces::{SpApiClient, TwoPhaseConfig};
use brickdesk_sync::{AmazonQueueJob, FullSyncService, JobOutcome, PlatformSync};

/// `--user` wins over `BRICKDESK_SYNC_USER_ID`.
pub(crate) fn resolve_user(flag: Option<Uuid>, config: &AppConfig) -> anyhow::Result<Uuid> {
    flag.or(config.sync_user_id).ok_or_else(|| {
        anyhow::anyhow!("no tenant given; pass --user or set BRICKDESK_SYNC_USER_ID")
    })
}

/// # Errors
///
/// Returns an error if the jobs cannot be built or the run rows cannot be
/// written. Individual job failures are printed, not propagated.
pub(crate) async fn run_full(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    user: Uuid,
) -> anyhow::Result<()> {
    let service = FullSyncService::from_config(pool.clone(), config, user)?;
    if service.job_names().is_empty() {
        println!("no platforms configured; nothing to sync");
        return Ok(());
    }

    let summary = service.run("manual").await?;
    for job in &summary.jobs {
        let outcome = match &job.outcome {
            JobOutcome::Succeeded { records } => format!("ok ({records} records)"),
            JobOutcome::Failed { error } => format!("failed: {error}"),
            JobOutcome::TimedOut => "timed out".to_owned(),
        };
        println!("{:<20}{:>8}ms  {outcome}", job.job, job.duration_ms);
    }
    println!("{}", summary.headline());
    Ok(())
}

/// Upper bound on a manual Amazon run using the full-length feed windows.
const MANUAL_AMAZON_BUDGET: Duration = Duration::from_secs(60 * 60);

/// Runs the Amazon queue once with the full-length feed polling windows.
///
/// # Errors
///
/// Returns an error if SP-API is not configured or the run fails.
pub(crate) async fn run_amazon(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    user: Uuid,
) -> anyhow::Result<()> {
    let amazon = config
        .amazon
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("Amazon SP-API credentials are not configured"))?;
    let client = SpApiClient::from_config(amazon, &config.http)?;
    let job = AmazonQueueJob::new(
        pool.clone(),
        user,
        Arc::new(client),
        TwoPhaseConfig::default(),
        MANUAL_AMAZON_BUDGET,
    );

    let processed = job.run().await?;
    println!("amazon sync processed {processed} queued update(s)");
    Ok(())
}
