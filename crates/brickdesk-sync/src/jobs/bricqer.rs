use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use brickdesk_bricqer::{normalize_inventory_item, normalize_order, BricqerClient};

use crate::full_sync::PlatformSync;

/// Pulls Bricqer orders into `platform_orders`.
pub struct BricqerOrdersJob {
    pool: PgPool,
    user_id: Uuid,
    client: BricqerClient,
    max_pages: usize,
}

impl BricqerOrdersJob {
    #[must_use]
    pub fn new(pool: PgPool, user_id: Uuid, client: BricqerClient, max_pages: usize) -> Self {
        Self {
            pool,
            user_id,
            client,
            max_pages,
        }
    }
}

#[async_trait]
impl PlatformSync for BricqerOrdersJob {
    fn name(&self) -> &'static str {
        "bricqer-orders"
    }

    async fn run(&self) -> anyhow::Result<usize> {
        let orders = self
            .client
            .fetch_all_orders(self.max_pages)
            .await
            .context("fetching Bricqer orders")?;

        let mut stored = 0usize;
        let mut skipped = 0usize;
        for order in &orders {
            match normalize_order(order) {
                Ok(normalized) => {
                    brickdesk_db::upsert_platform_order(&self.pool, self.user_id, &normalized)
                        .await
                        .with_context(|| format!("storing Bricqer order {}", order.id))?;
                    stored += 1;
                }
                Err(e) => {
                    tracing::warn!(order_id = order.id, error = %e, "skipping Bricqer order");
                    skipped += 1;
                }
            }
        }

        tracing::info!(fetched = orders.len(), stored, skipped, "Bricqer orders synced");
        Ok(stored)
    }
}

/// Mirrors Bricqer minifig stock into `minifig_sync_items`.
pub struct BricqerInventoryJob {
    pool: PgPool,
    user_id: Uuid,
    client: BricqerClient,
    max_pages: usize,
}

impl BricqerInventoryJob {
    #[must_use]
    pub fn new(pool: PgPool, user_id: Uuid, client: BricqerClient, max_pages: usize) -> Self {
        Self {
            pool,
            user_id,
            client,
            max_pages,
        }
    }
}

#[async_trait]
impl PlatformSync for BricqerInventoryJob {
    fn name(&self) -> &'static str {
        "bricqer-inventory"
    }

    async fn run(&self) -> anyhow::Result<usize> {
        let items = self
            .client
            .fetch_all_inventory(self.max_pages)
            .await
            .context("fetching Bricqer inventory")?;

        let mut stored = 0usize;
        for minifig in items.iter().filter_map(normalize_inventory_item) {
            brickdesk_db::upsert_minifig_item(&self.pool, self.user_id, &minifig)
                .await
                .with_context(|| format!("storing Bricqer item {}", minifig.bricqer_item_id))?;
            stored += 1;
        }

        tracing::info!(fetched = items.len(), minifigs = stored, "Bricqer inventory synced");
        Ok(stored)
    }
}
