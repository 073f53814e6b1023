//! Full sync: every configured platform job runs concurrently under its own
//! timeout, then one summary goes to the notifier.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use brickdesk_core::AppConfig;

use crate::jobs::build_jobs;
use crate::notifier::{notifier_from_config, Notifier};

/// One platform's sync step.
#[async_trait]
pub trait PlatformSync: Send + Sync {
    /// Stable job name, stored in `sync_runs.job`.
    fn name(&self) -> &'static str;

    /// Runs the job to completion and returns how many records it touched.
    async fn run(&self) -> anyhow::Result<usize>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobOutcome {
    Succeeded { records: usize },
    Failed { error: String },
    TimedOut,
}

impl JobOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobReport {
    pub job: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<i64>,
    #[serde(flatten)]
    pub outcome: JobOutcome,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FullSyncSummary {
    pub trigger: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub jobs: Vec<JobReport>,
}

impl FullSyncSummary {
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.jobs.iter().filter(|j| j.outcome.is_success()).count()
    }

    /// One-line description, e.g. `full sync (cron): 3/4 jobs succeeded, 1 failed, 0 timed out`.
    #[must_use]
    pub fn headline(&self) -> String {
        let timed_out = self
            .jobs
            .iter()
            .filter(|j| j.outcome == JobOutcome::TimedOut)
            .count();
        let failed = self.jobs.len() - self.succeeded() - timed_out;
        format!(
            "full sync ({}): {}/{} jobs succeeded, {failed} failed, {timed_out} timed out",
            self.trigger,
            self.succeeded(),
            self.jobs.len(),
        )
    }
}

/// Runs one job under `timeout`. Errors and timeouts become outcomes.
pub async fn run_job(job: &dyn PlatformSync, timeout: Duration) -> JobReport {
    let started = Instant::now();
    let outcome = match tokio::time::timeout(timeout, job.run()).await {
        Ok(Ok(records)) => {
            tracing::info!(job = job.name(), records, "sync job succeeded");
            JobOutcome::Succeeded { records }
        }
        Ok(Err(e)) => {
            tracing::error!(job = job.name(), error = %format!("{e:#}"), "sync job failed");
            JobOutcome::Failed {
                error: format!("{e:#}"),
            }
        }
        Err(_) => {
            tracing::warn!(job = job.name(), timeout_secs = timeout.as_secs(), "sync job timed out");
            JobOutcome::TimedOut
        }
    };

    JobReport {
        job: job.name().to_owned(),
        run_id: None,
        outcome,
        duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
    }
}

/// Runs every job concurrently. A failing or slow job never cancels the others;
/// reports come back in job order.
pub async fn run_full_sync(jobs: &[Arc<dyn PlatformSync>], timeout: Duration) -> Vec<JobReport> {
    join_all(jobs.iter().map(|job| run_job(job.as_ref(), timeout))).await
}

/// Full sync with `sync_runs` bookkeeping and a closing notification.
pub struct FullSyncService {
    pool: PgPool,
    user_id: Uuid,
    jobs: Vec<Arc<dyn PlatformSync>>,
    timeout: Duration,
    notifier: Arc<dyn Notifier>,
}

impl FullSyncService {
    #[must_use]
    pub fn new(
        pool: PgPool,
        user_id: Uuid,
        jobs: Vec<Arc<dyn PlatformSync>>,
        timeout: Duration,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            pool,
            user_id,
            jobs,
            timeout,
            notifier,
        }
    }

    /// Wires every configured platform job and the configured notifier for
    /// `user_id`, with `sync_timeout_secs` as the per-job limit.
    ///
    /// # Errors
    ///
    /// Fails if a client or the notifier cannot be built from `config`.
    pub fn from_config(pool: PgPool, config: &AppConfig, user_id: Uuid) -> anyhow::Result<Self> {
        let jobs = build_jobs(&pool, config, user_id)?;
        let notifier = notifier_from_config(config)?;
        Ok(Self::new(
            pool,
            user_id,
            jobs,
            Duration::from_secs(config.sync_timeout_secs),
            notifier,
        ))
    }

    #[must_use]
    pub fn job_names(&self) -> Vec<&'static str> {
        self.jobs.iter().map(|j| j.name()).collect()
    }

    /// Creates one queued `sync_runs` row per job, runs them all, records each
    /// terminal status, then notifies. A notifier failure is logged only.
    ///
    /// # Errors
    ///
    /// Returns an error only if the run rows cannot be created. Rows created
    /// before the failure are marked `failed`.
    pub async fn run(&self, trigger: &str) -> anyhow::Result<FullSyncSummary> {
        let started_at = Utc::now();

        let mut run_ids = Vec::with_capacity(self.jobs.len());
        for job in &self.jobs {
            match brickdesk_db::create_sync_run(&self.pool, self.user_id, job.name(), trigger).await
            {
                Ok(run) => run_ids.push(run.id),
                Err(e) => {
                    let error = format!("full sync aborted before start: {e}");
                    for (job, run_id) in self.jobs.iter().zip(&run_ids) {
                        fail_run_best_effort(&self.pool, *run_id, job.name(), &error).await;
                    }
                    return Err(anyhow::Error::new(e).context("creating sync run rows"));
                }
            }
        }

        tracing::info!(trigger, jobs = self.jobs.len(), "full sync started");
        let jobs = join_all(
            self.jobs
                .iter()
                .zip(run_ids)
                .map(|(job, run_id)| self.run_tracked(job.as_ref(), run_id)),
        )
        .await;

        let summary = FullSyncSummary {
            trigger: trigger.to_owned(),
            started_at,
            finished_at: Utc::now(),
            jobs,
        };
        tracing::info!(trigger, summary = %summary.headline(), "full sync finished");

        if let Err(e) = self.notifier.notify(&summary).await {
            tracing::warn!(error = %e, "full sync notification failed");
        }
        Ok(summary)
    }

    async fn run_tracked(&self, job: &dyn PlatformSync, run_id: i64) -> JobReport {
        if let Err(e) = brickdesk_db::start_sync_run(&self.pool, run_id).await {
            let error = format!("could not start run: {e}");
            fail_run_best_effort(&self.pool, run_id, job.name(), &error).await;
            return JobReport {
                job: job.name().to_owned(),
                run_id: Some(run_id),
                outcome: JobOutcome::Failed { error },
                duration_ms: 0,
            };
        }

        let mut report = run_job(job, self.timeout).await;
        report.run_id = Some(run_id);

        let recorded = match &report.outcome {
            JobOutcome::Succeeded { records } => {
                let records = i32::try_from(*records).unwrap_or(i32::MAX);
                brickdesk_db::complete_sync_run(&self.pool, run_id, records).await
            }
            JobOutcome::Failed { error } => {
                brickdesk_db::fail_sync_run(&self.pool, run_id, error).await
            }
            JobOutcome::TimedOut => {
                let message = format!("timed out after {}s", self.timeout.as_secs());
                brickdesk_db::time_out_sync_run(&self.pool, run_id, &message).await
            }
        };
        if let Err(e) = recorded {
            tracing::error!(job = job.name(), run_id, error = %e, "failed to record sync run status");
        }
        report
    }
}

async fn fail_run_best_effort(pool: &PgPool, run_id: i64, job: &str, error: &str) {
    if let Err(e) = brickdesk_db::fail_sync_run(pool, run_id, error).await {
        tracing::error!(job, run_id, error = %e, "failed to mark sync run as failed");
    }
}

#[cfg(test)]
#[path = "full_sync_test.rs"]
mod tests;
