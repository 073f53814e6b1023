//! Catalogue maintenance commands: ASIN discovery, RRP backfill, Keepa export.

use std::time::Duration;

use rust_decimal::Decimal;
use tokio::time::Instant;

use brickdesk_core::AppConfig;
use brickdesk_keepa::KeepaClient;
use brickdesk_marketplaces::BricksetClient;
use brickdesk_sync::{DiscoveryPageReport, KeepaExportRow, UkPriceSource};

/// Budget for one discovery page when run from a terminal.
const PAGE_TIME_BUDGET: Duration = Duration::from_secs(600);

fn keepa_client(config: &AppConfig) -> anyhow::Result<KeepaClient> {
    let keepa = config
        .keepa
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("KEEPA_API_KEY is not set"))?;
    Ok(KeepaClient::from_config(keepa, &config.http)?)
}

/// # Errors
///
/// Returns an error if Keepa is not configured or a page cannot be loaded.
pub(crate) async fn run_discover_asins(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    offset: i64,
    limit: i64,
    all: bool,
) -> anyhow::Result<()> {
    let client = keepa_client(config)?;
    let mut totals = DiscoveryPageReport::default();
    let mut next = Some(offset);

    while let Some(page_offset) = next {
        let deadline = Instant::now() + PAGE_TIME_BUDGET;
        let page =
            brickdesk_sync::run_discovery_page(pool, &client, page_offset, limit, deadline).await?;
        println!(
            "offset {page_offset}: {} processed, {} found, {} not found, {} multiple, {} errors",
            page.processed, page.found, page.not_found, page.multiple, page.errors
        );

        totals.processed += page.processed;
        totals.found += page.found;
        totals.not_found += page.not_found;
        totals.multiple += page.multiple;
        totals.errors += page.errors;
        next = if all { page.next_offset } else { None };
        totals.next_offset = page.next_offset;
    }

    println!(
        "discovery finished: {} processed, {} found, {} not found, {} multiple, {} errors",
        totals.processed, totals.found, totals.not_found, totals.multiple, totals.errors
    );
    if let Some(resume) = totals.next_offset.filter(|_| !all) {
        println!("more candidates pending; resume with --offset {resume}");
    }
    Ok(())
}

/// # Errors
///
/// Returns an error if the Brickset client cannot be built or a query fails.
pub(crate) async fn run_backfill_rrp(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    skip_brickset: bool,
) -> anyhow::Result<()> {
    let brickset = match (&config.brickset_api_key, skip_brickset) {
        (Some(key), false) => Some(BricksetClient::new(key, &config.http)?),
        (None, false) => {
            tracing::warn!("BRICKSET_API_KEY not set; skipping the Brickset pass");
            None
        }
        (_, true) => None,
    };

    let report = brickdesk_sync::backfill_rrp(
        pool,
        brickset.as_ref().map(|c| c as &dyn UkPriceSource),
    )
    .await?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn csv_cell(value: Option<Decimal>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn csv_line(row: &KeepaExportRow) -> String {
    format!(
        "{},{},{},{},{},{}",
        row.set_number,
        row.asin,
        csv_cell(row.rrp),
        csv_cell(row.current_price),
        csv_cell(row.was90),
        csv_cell(row.price_1yr_ago)
    )
}

/// # Errors
///
/// Returns an error if Keepa is not configured or the export fails.
pub(crate) async fn run_keepa_export(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    set_numbers: &[String],
) -> anyhow::Result<()> {
    let client = keepa_client(config)?;
    let rows = brickdesk_sync::export_keepa_prices(pool, &client, set_numbers).await?;

    println!("set_number,asin,rrp,current_price,was90,price_1yr_ago");
    for row in &rows {
        println!("{}", csv_line(row));
    }
    Ok(())
}
