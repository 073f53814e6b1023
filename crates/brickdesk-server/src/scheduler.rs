//! Background job scheduler.
//!
//! Registers the recurring full sync at server startup.

use std::sync::Arc;

use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use uuid::Uuid;

use brickdesk_core::AppConfig;
use brickdesk_sync::FullSyncService;

/// Builds and starts the scheduler. The returned handle must be kept alive;
/// dropping it stops every job.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// the cron expression is invalid, or the scheduler fails to start.
pub async fn build_scheduler(
    pool: PgPool,
    config: Arc<AppConfig>,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    match config.sync_user_id {
        Some(user_id) => register_full_sync_job(&scheduler, pool, config, user_id).await?,
        None => tracing::warn!("BRICKDESK_SYNC_USER_ID not set; scheduled full sync disabled"),
    }

    scheduler.start().await?;
    Ok(scheduler)
}

/// Full sync on `full_sync_cron` (twice a day by default).
async fn register_full_sync_job(
    scheduler: &JobScheduler,
    pool: PgPool,
    config: Arc<AppConfig>,
    user_id: Uuid,
) -> Result<(), JobSchedulerError> {
    let schedule = config.full_sync_cron.clone();
    let pool = Arc::new(pool);

    let job = Job::new_async(schedule.as_str(), move |_uuid, _lock| {
        let pool = Arc::clone(&pool);
        let config = Arc::clone(&config);

        Box::pin(async move {
            tracing::info!("scheduler: starting full sync");
            run_full_sync_job(&pool, &config, user_id).await;
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron = %schedule, %user_id, "scheduler: full sync registered");
    Ok(())
}

async fn run_full_sync_job(pool: &PgPool, config: &AppConfig, user_id: Uuid) {
    let service = match FullSyncService::from_config(pool.clone(), config, user_id) {
        Ok(service) => service,
        Err(e) => {
            tracing::error!(error = %e, "scheduler: could not build full sync");
            return;
        }
    };

    match service.run("cron").await {
        Ok(summary) => tracing::info!(
            succeeded = summary.succeeded(),
            jobs = summary.jobs.len(),
            "scheduler: {}",
            summary.headline()
        ),
        Err(e) => tracing::error!(error = %e, "scheduler: full sync failed"),
    }
}
