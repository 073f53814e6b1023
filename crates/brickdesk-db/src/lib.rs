use std::time::Duration;

use brickdesk_core::{AppConfig, InventoryStatus};
use sqlx::{postgres::PgPoolOptions, PgPool};
use thiserror::Error;

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_MIN_CONNECTIONS: u32 = 1;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 10;

// Path relative to crates/brickdesk-db/Cargo.toml; resolves to <workspace-root>/migrations/
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            min_connections: DEFAULT_MIN_CONNECTIONS,
            acquire_timeout_secs: DEFAULT_ACQUIRE_TIMEOUT_SECS,
        }
    }
}

impl PoolConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            max_connections: config.db_max_connections,
            min_connections: config.db_min_connections,
            acquire_timeout_secs: config.db_acquire_timeout_secs,
        }
    }
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error("record not found")]
    NotFound,

    #[error("inventory item {id} cannot move from {from} to {to}")]
    InvalidInventoryTransition {
        id: i64,
        from: InventoryStatus,
        to: InventoryStatus,
    },

    #[error("sync run {id} is not in expected status '{expected_status}'")]
    InvalidSyncRunTransition {
        id: i64,
        expected_status: &'static str,
    },

    #[error("minifig item {id} is not in status {expected_status}")]
    ListingStateConflict {
        id: i64,
        expected_status: &'static str,
    },

    #[error("invalid {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },

    #[error("stored value is malformed: {0}")]
    Corrupt(#[from] brickdesk_core::UnknownStatus),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Connect to a Postgres pool using explicit URL and config.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the connection cannot be established.
pub async fn connect_pool(database_url: &str, config: PoolConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect(database_url)
        .await
}

/// Run all pending migrations against the pool.
///
/// Returns the number of migrations that were applied.
///
/// # Errors
///
/// Returns [`sqlx::migrate::MigrateError`] if any migration fails.
pub async fn run_migrations(pool: &PgPool) -> Result<usize, sqlx::migrate::MigrateError> {
    // _sqlx_migrations is absent on a fresh database; count that as zero.
    let applied_before = count_applied_migrations(pool).await;
    MIGRATOR.run(pool).await?;
    let applied_after = count_applied_migrations(pool).await;

    let delta = (applied_after - applied_before).max(0);
    Ok(usize::try_from(delta).unwrap_or(0))
}

async fn count_applied_migrations(pool: &PgPool) -> i64 {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = true")
        .fetch_one(pool)
        .await
        .unwrap_or(0)
}

/// Send a `SELECT 1` to verify the pool has a live connection.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(pool)
        .await?;
    Ok(())
}

/// Ping the pool and return a typed error on failure.
///
/// # Errors
///
/// Returns [`DbError`] if the ping fails.
pub async fn health_check(pool: &PgPool) -> Result<(), DbError> {
    ping(pool).await?;
    Ok(())
}


pub mod amazon_queue;
pub mod arbitrage;
pub mod catalog;
pub mod inventory;
pub mod minifigs;
pub mod orders;
pub mod purchases;
pub mod reports;
pub mod sync_runs;

pub use amazon_queue::{
    claim_pending_amazon_updates, enqueue_amazon_update, record_amazon_outcome,
    release_amazon_claims, AmazonQueueRow, NewAmazonQueueEntry,
};
pub use arbitrage::{list_arbitrage_candidates, update_source_prices, ArbitrageCandidateRow};
pub use catalog::{
    get_brickset_set, insert_price_snapshot, list_discovery_candidates, list_found_asins,
    list_sets_missing_rrp, list_snapshot_prices, record_discovery_result, set_uk_rrp,
    upsert_asin_pricing, upsert_brickset_set, BricksetSetRow, DiscoveryCandidateRow,
    DiscoveryUpdate, FoundAsinRow, MissingRrpRow, KEEPA_BUYBOX_SOURCE,
};
pub use inventory::{
    get_inventory_item, list_inventory, transition_inventory_status, InventoryFilters,
    InventoryItemRow, TransitionDetails,
};
pub use minifigs::{
    claim_minifig_for_publish, get_minifig_item, mark_minifig_published,
    revert_minifig_to_staged, stage_minifig_listing, upsert_minifig_item, MinifigSyncRow,
    StagedListing,
};
pub use orders::{list_platform_orders, upsert_platform_order, OrderFilters, PlatformOrderRow};
pub use purchases::{
    create_purchase_with_items, CreatedPurchase, NewInventoryItem, NewPurchase, PurchaseRow,
};
pub use reports::{profit_and_loss, ProfitLossRow};
pub use sync_runs::{
    complete_sync_run, create_sync_run, fail_sync_run, get_sync_run, list_sync_runs,
    start_sync_run, time_out_sync_run, SyncRunRow,
};
