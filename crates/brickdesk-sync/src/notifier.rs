//! Where a finished full sync gets reported.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde_json::json;

use brickdesk_core::AppConfig;

use crate::error::SyncError;
use crate::full_sync::FullSyncSummary;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, summary: &FullSyncSummary) -> Result<(), SyncError>;
}

/// Writes the summary to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, summary: &FullSyncSummary) -> Result<(), SyncError> {
        for job in &summary.jobs {
            tracing::info!(
                trigger = %summary.trigger,
                job = %job.job,
                outcome = ?job.outcome,
                duration_ms = job.duration_ms,
                "full sync job result"
            );
        }
        tracing::info!(summary = %summary.headline(), "full sync summary");
        Ok(())
    }
}

/// POSTs `{ "text": headline, "summary": … }` to a webhook.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: Url,
}

impl WebhookNotifier {
    /// # Errors
    ///
    /// Returns [`SyncError::Validation`] for an unparseable URL, or
    /// [`SyncError::Http`] if the client cannot be built.
    pub fn new(url: &str, timeout_secs: u64, user_agent: &str) -> Result<Self, SyncError> {
        let url = Url::parse(url).map_err(|e| SyncError::Validation {
            field: "notify_webhook_url",
            reason: e.to_string(),
        })?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, summary: &FullSyncSummary) -> Result<(), SyncError> {
        let body = json!({
            "text": summary.headline(),
            "summary": summary,
        });
        let response = self.client.post(self.url.clone()).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::Notify {
                status: status.as_u16(),
            });
        }
        tracing::debug!(status = status.as_u16(), "full sync webhook delivered");
        Ok(())
    }
}

/// Webhook when `BRICKDESK_NOTIFY_WEBHOOK_URL` is set, log otherwise.
///
/// # Errors
///
/// Returns the [`WebhookNotifier::new`] error for a bad URL.
pub fn notifier_from_config(config: &AppConfig) -> Result<Arc<dyn Notifier>, SyncError> {
    match config.notify_webhook_url.as_deref() {
        Some(url) => Ok(Arc::new(WebhookNotifier::new(
            url,
            config.http.timeout_secs,
            &config.http.user_agent,
        )?)),
        None => Ok(Arc::new(LogNotifier)),
    }
}
