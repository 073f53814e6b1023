//! Orchestration over the platform clients and the database: the scheduled
//! full sync, minifig listing actions, ASIN discovery paging, RRP backfill and
//! Keepa price export.

pub mod discovery;
pub mod error;
pub mod full_sync;
pub mod jobs;
pub mod keepa_export;
pub mod listing;
pub mod notifier;
pub mod rrp_backfill;

pub use discovery::{run_discovery_page, DiscoveryPageReport};
pub use error::SyncError;
pub use full_sync::{
    run_full_sync, run_job, FullSyncService, FullSyncSummary, JobOutcome, JobReport, PlatformSync,
};
pub use jobs::{
    amazon_job_budget, build_jobs, daily_buy_box_points, scheduled_two_phase_config,
    AmazonQueueJob, BrickOwlOrdersJob, BricqerInventoryJob, BricqerOrdersJob, KeepaPricingJob,
    DEFAULT_CLAIM_LIMIT, SCHEDULED_AMAZON_CLAIM_LIMIT,
};
pub use keepa_export::{build_export_rows, export_keepa_prices, KeepaExportRow, EXPORT_BATCH_SIZE};
pub use listing::{publish_staged_listing, stage_listing};
pub use notifier::{notifier_from_config, LogNotifier, Notifier, WebhookNotifier};
pub use rrp_backfill::{backfill_rrp, RrpBackfillReport, UkPriceSource};
