use std::collections::{BTreeMap, HashMap};

use anyhow::Context;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use brickdesk_db::KEEPA_BUYBOX_SOURCE;
use brickdesk_keepa::{
    extract_prices, parse_price_history, KeepaClient, KeepaProduct, BUY_BOX_INDEX, MAX_IDENTIFIERS,
};

use crate::full_sync::PlatformSync;

/// Refreshes Amazon prices for every set with a discovered ASIN and stores
/// the buy-box history as daily snapshots.
pub struct KeepaPricingJob {
    pool: PgPool,
    client: KeepaClient,
}

impl KeepaPricingJob {
    #[must_use]
    pub fn new(pool: PgPool, client: KeepaClient) -> Self {
        Self { pool, client }
    }
}

/// Buy-box history collapsed to the last price seen on each day.
#[must_use]
pub fn daily_buy_box_points(product: &KeepaProduct) -> Vec<(NaiveDate, Decimal)> {
    let Some(raw) = product
        .csv
        .as_ref()
        .and_then(|series| series.get(BUY_BOX_INDEX))
        .and_then(Option::as_ref)
    else {
        return Vec::new();
    };

    let mut by_day = BTreeMap::new();
    for (at, price) in parse_price_history(raw) {
        by_day.insert(at.date_naive(), price);
    }
    by_day.into_iter().collect()
}

#[async_trait]
impl PlatformSync for KeepaPricingJob {
    fn name(&self) -> &'static str {
        "keepa-pricing"
    }

    async fn run(&self) -> anyhow::Result<usize> {
        let found = brickdesk_db::list_found_asins(&self.pool, None)
            .await
            .context("loading found ASINs")?;

        let mut sets_by_asin: HashMap<String, Vec<String>> = HashMap::new();
        for row in found {
            sets_by_asin.entry(row.asin).or_default().push(row.set_number);
        }
        let asins: Vec<String> = sets_by_asin.keys().cloned().collect();

        let now = Utc::now();
        let today = now.date_naive();
        let mut updated = 0usize;
        let mut snapshots = 0usize;
        let mut failed_batches = 0usize;
        let batch_count = asins.len().div_ceil(MAX_IDENTIFIERS);

        for batch in asins.chunks(MAX_IDENTIFIERS) {
            let products = match self.client.products_by_asin(batch).await {
                Ok(products) => products,
                Err(e) => {
                    tracing::warn!(batch_size = batch.len(), error = %e, "Keepa batch failed");
                    failed_batches += 1;
                    continue;
                }
            };

            for product in &products {
                let Some(sets) = sets_by_asin.get(&product.asin) else {
                    continue;
                };
                let prices = extract_prices(product, now);
                let history = daily_buy_box_points(product);

                for set_number in sets {
                    brickdesk_db::upsert_asin_pricing(
                        &self.pool,
                        set_number,
                        &product.asin,
                        prices.current_buy_box,
                        prices.was90,
                    )
                    .await?;
                    updated += 1;

                    let points = history
                        .iter()
                        .copied()
                        .chain(prices.current_buy_box.map(|p| (today, p)));
                    for (date, price) in points {
                        let inserted = brickdesk_db::insert_price_snapshot(
                            &self.pool,
                            set_number,
                            Some(&product.asin),
                            date,
                            price,
                            KEEPA_BUYBOX_SOURCE,
                        )
                        .await?;
                        if inserted {
                            snapshots += 1;
                        }
                    }
                }
            }
        }

        if batch_count > 0 && failed_batches == batch_count {
            anyhow::bail!("all {failed_batches} Keepa batches failed");
        }

        tracing::info!(asins = asins.len(), updated, snapshots, failed_batches, "Keepa pricing refreshed");
        Ok(updated)
    }
}
