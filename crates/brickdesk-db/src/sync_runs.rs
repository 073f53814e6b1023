//! Database operations for `sync_runs`.
//!
//! One row per platform job per full sync. Status moves
//! `queued` → `running` → `succeeded` | `failed` | `timed_out`; every transition
//! is a conditional update so a row never leaves a terminal state.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `sync_runs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SyncRunRow {
    pub id: i64,
    pub public_id: Uuid,
    pub user_id: Uuid,
    pub job: String,
    pub trigger_source: String,
    pub status: String,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub records_processed: i32,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

const SYNC_RUN_COLUMNS: &str = "id, public_id, user_id, job, trigger_source, status, \
     started_at, completed_at, records_processed, error_message, created_at";

/// Creates a new run in `queued` status.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_sync_run(
    pool: &PgPool,
    user_id: Uuid,
    job: &str,
    trigger_source: &str,
) -> Result<SyncRunRow, DbError> {
    let sql = format!(
        "INSERT INTO sync_runs (public_id, user_id, job, trigger_source, status) \
         VALUES ($1, $2, $3, $4, 'queued') \
         RETURNING {SYNC_RUN_COLUMNS}"
    );
    let row = sqlx::query_as::<_, SyncRunRow>(&sql)
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(job)
        .bind(trigger_source)
        .fetch_one(pool)
        .await?;

    Ok(row)
}

/// Marks a run as `running` and sets `started_at = NOW()`.
///
/// # Errors
///
/// Returns [`DbError::InvalidSyncRunTransition`] if the run is not `queued`.
pub async fn start_sync_run(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE sync_runs \
         SET status = 'running', started_at = NOW() \
         WHERE id = $1 AND status = 'queued'",
    )
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidSyncRunTransition {
            id,
            expected_status: "queued",
        });
    }
    Ok(())
}

/// Marks a run as `succeeded` with its record count.
///
/// # Errors
///
/// Returns [`DbError::InvalidSyncRunTransition`] if the run is not `running`.
pub async fn complete_sync_run(
    pool: &PgPool,
    id: i64,
    records_processed: i32,
) -> Result<(), DbError> {
    finish_sync_run(pool, id, "succeeded", Some(records_processed), None, &["running"]).await
}

/// Marks a run as `failed` with an error message. A run that never got
/// started can fail straight from `queued`.
///
/// # Errors
///
/// Returns [`DbError::InvalidSyncRunTransition`] if the run is already terminal.
pub async fn fail_sync_run(pool: &PgPool, id: i64, error_message: &str) -> Result<(), DbError> {
    finish_sync_run(pool, id, "failed", None, Some(error_message), &["queued", "running"]).await
}

/// Marks a run as `timed_out`.
///
/// # Errors
///
/// Returns [`DbError::InvalidSyncRunTransition`] if the run is not `running`.
pub async fn time_out_sync_run(pool: &PgPool, id: i64, error_message: &str) -> Result<(), DbError> {
    finish_sync_run(pool, id, "timed_out", None, Some(error_message), &["running"]).await
}

async fn finish_sync_run(
    pool: &PgPool,
    id: i64,
    status: &'static str,
    records_processed: Option<i32>,
    error_message: Option<&str>,
    from: &[&'static str],
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE sync_runs SET \
             status            = $2, \
             completed_at      = NOW(), \
             records_processed = COALESCE($3, records_processed), \
             error_message     = $4 \
         WHERE id = $1 AND status = ANY($5)",
    )
    .bind(id)
    .bind(status)
    .bind(records_processed)
    .bind(error_message)
    .bind(from)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidSyncRunTransition {
            id,
            expected_status: if from.len() == 1 { "running" } else { "queued or running" },
        });
    }
    Ok(())
}

/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given `id`.
pub async fn get_sync_run(pool: &PgPool, id: i64) -> Result<SyncRunRow, DbError> {
    let sql = format!("SELECT {SYNC_RUN_COLUMNS} FROM sync_runs WHERE id = $1");
    sqlx::query_as::<_, SyncRunRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)
}

/// Returns a tenant's most recent `limit` runs, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_sync_runs(
    pool: &PgPool,
    user_id: Uuid,
    limit: i64,
) -> Result<Vec<SyncRunRow>, DbError> {
    let sql = format!(
        "SELECT {SYNC_RUN_COLUMNS} FROM sync_runs \
         WHERE user_id = $1 \
         ORDER BY created_at DESC, id DESC \
         LIMIT $2"
    );
    let rows = sqlx::query_as::<_, SyncRunRow>(&sql)
        .bind(user_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}
