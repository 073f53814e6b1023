//! Paged ASIN discovery over pending catalogue sets.
//!
//! Each call handles one page of pending candidates and stops starting new
//! Keepa work once the deadline passes. Finished sets leave the pending pool,
//! so a follow-up page resumes at the same offset.

use serde::Serialize;
use sqlx::PgPool;
use tokio::time::Instant;

use brickdesk_core::DiscoveryStatus;
use brickdesk_db::DiscoveryUpdate;
use brickdesk_keepa::{discover, DiscoveryCandidate, ProductSource};

use crate::error::SyncError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiscoveryPageReport {
    pub processed: usize,
    pub found: usize,
    pub not_found: usize,
    pub multiple: usize,
    pub errors: usize,
    /// Offset for the next call, `None` when nothing is left to page through.
    pub next_offset: Option<i64>,
}

/// # Errors
///
/// Returns [`SyncError::Validation`] for a negative offset or non-positive
/// limit, or [`SyncError::Db`] if candidates cannot be loaded.
pub async fn run_discovery_page(
    pool: &PgPool,
    source: &dyn ProductSource,
    offset: i64,
    limit: i64,
    deadline: Instant,
) -> Result<DiscoveryPageReport, SyncError> {
    if offset < 0 {
        return Err(SyncError::Validation {
            field: "offset",
            reason: "must be zero or more".to_owned(),
        });
    }
    if limit <= 0 {
        return Err(SyncError::Validation {
            field: "limit",
            reason: "must be positive".to_owned(),
        });
    }

    let rows = brickdesk_db::list_discovery_candidates(pool, offset, limit).await?;
    let page_was_full = i64::try_from(rows.len()).unwrap_or(i64::MAX) >= limit;
    let candidates: Vec<DiscoveryCandidate> = rows
        .into_iter()
        .map(|r| DiscoveryCandidate {
            set_number: r.set_number,
            set_name: r.set_name,
            ean: r.ean,
            upc: r.upc,
        })
        .collect();

    let outcome = discover(source, candidates, deadline).await;

    let mut report = DiscoveryPageReport::default();
    for found in &outcome.matches {
        let update = DiscoveryUpdate {
            set_number: &found.set_number,
            status: found.status,
            asin: found.asin.as_deref(),
            match_method: found.match_method.map(|m| m.as_str()),
            match_confidence: found.confidence,
            amazon_title: found.amazon_title.as_deref(),
            alternative_asins: &found.alternative_asins,
            error_message: found.error_message.as_deref(),
        };
        if let Err(e) = brickdesk_db::record_discovery_result(pool, &update).await {
            tracing::error!(set_number = %found.set_number, error = %e, "failed to store discovery result");
            report.errors += 1;
            continue;
        }

        report.processed += 1;
        match found.status {
            DiscoveryStatus::Found => report.found += 1,
            DiscoveryStatus::NotFound => report.not_found += 1,
            DiscoveryStatus::Multiple => report.multiple += 1,
            DiscoveryStatus::Error => report.errors += 1,
            DiscoveryStatus::Pending => {}
        }
    }

    let hit_deadline = !outcome.unprocessed.is_empty();
    report.next_offset = if (page_was_full || hit_deadline) && report.processed > 0 {
        Some(offset)
    } else {
        None
    };

    tracing::info!(
        offset,
        limit,
        processed = report.processed,
        found = report.found,
        left_pending = outcome.unprocessed.len(),
        next_offset = ?report.next_offset,
        "ASIN discovery page finished"
    );
    Ok(report)
}
