use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use brickdesk_marketplaces::{normalize_brickowl_order, BrickOwlClient};

use crate::full_sync::PlatformSync;

pub struct BrickOwlOrdersJob {
    pool: PgPool,
    user_id: Uuid,
    client: BrickOwlClient,
}

impl BrickOwlOrdersJob {
    #[must_use]
    pub fn new(pool: PgPool, user_id: Uuid, client: BrickOwlClient) -> Self {
        Self {
            pool,
            user_id,
            client,
        }
    }
}

#[async_trait]
impl PlatformSync for BrickOwlOrdersJob {
    fn name(&self) -> &'static str {
        "brickowl-orders"
    }

    async fn run(&self) -> anyhow::Result<usize> {
        let orders = self
            .client
            .list_orders()
            .await
            .context("fetching Brick Owl orders")?;

        let mut stored = 0usize;
        for order in &orders {
            match normalize_brickowl_order(order) {
                Ok(normalized) => {
                    brickdesk_db::upsert_platform_order(&self.pool, self.user_id, &normalized)
                        .await
                        .with_context(|| format!("storing Brick Owl order {}", order.order_id))?;
                    stored += 1;
                }
                Err(e) => tracing::warn!(order_id = %order.order_id, error = %e, "skipping Brick Owl order"),
            }
        }

        tracing::info!(fetched = orders.len(), stored, "Brick Owl orders synced");
        Ok(stored)
    }
}
