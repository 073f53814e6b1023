//! Two-phase Amazon listing sync.
//!
//! Prices go out first. Only once a price is visible on the live listing is
//! the matching quantity sent, so stock never goes on sale at a stale price.

use std::time::Duration;

use futures::stream::{self, StreamExt};
use rust_decimal::Decimal;
use serde::Serialize;

use super::{FeedKind, FeedProcessingStatus, ListingUpdate, ListingsGateway};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TwoPhaseConfig {
    pub poll_interval: Duration,
    /// Status checks per feed before giving up on it.
    pub max_polls: u32,
    pub verify_interval: Duration,
    /// Live-price reads per SKU before it counts as unverified.
    pub verify_attempts: u32,
    /// SKUs whose live price is checked at the same time.
    pub verify_concurrency: usize,
    /// Largest difference between target and live price that still verifies.
    pub price_tolerance: Decimal,
}

impl Default for TwoPhaseConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            max_polls: 20,
            verify_interval: Duration::from_secs(30),
            verify_attempts: 5,
            verify_concurrency: 4,
            price_tolerance: Decimal::new(5, 3),
        }
    }
}

/// One queued change. At least one of `price` / `quantity` is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncItem {
    pub id: i64,
    pub sku: String,
    pub price: Option<Decimal>,
    pub quantity: Option<i32>,
}

impl SyncItem {
    fn as_update(&self) -> ListingUpdate {
        ListingUpdate {
            sku: self.sku.clone(),
            price: self.price,
            quantity: self.quantity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SyncOutcome {
    Completed,
    PriceFeedFailed { reason: String },
    PriceFeedTimeout,
    PriceNotVerified {
        expected: Decimal,
        observed: Option<Decimal>,
    },
    QuantityFeedFailed { reason: String },
}

impl SyncOutcome {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::PriceFeedFailed { .. } => "price_feed_failed",
            Self::PriceFeedTimeout => "price_feed_timeout",
            Self::PriceNotVerified { .. } => "price_not_verified",
            Self::QuantityFeedFailed { .. } => "quantity_feed_failed",
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Human-readable failure detail, `None` on success.
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        match self {
            Self::Completed => None,
            Self::PriceFeedFailed { reason } => Some(format!("price feed failed: {reason}")),
            Self::PriceFeedTimeout => Some("price feed did not finish in time".to_owned()),
            Self::PriceNotVerified { expected, observed } => Some(match observed {
                Some(live) => format!("live price {live} never matched {expected}"),
                None => format!("live price never matched {expected}: no offer found"),
            }),
            Self::QuantityFeedFailed { reason } => Some(format!("quantity feed failed: {reason}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncItemResult {
    pub id: i64,
    pub sku: String,
    pub outcome: SyncOutcome,
}

enum FeedResult {
    Done,
    Failed(String),
    TimedOut,
}

pub struct TwoPhaseSync<'a> {
    gateway: &'a dyn ListingsGateway,
    config: TwoPhaseConfig,
}

impl<'a> TwoPhaseSync<'a> {
    #[must_use]
    pub fn new(gateway: &'a dyn ListingsGateway, config: TwoPhaseConfig) -> Self {
        Self { gateway, config }
    }

    /// Runs the price phase then the quantity phase. Returns one result per
    /// input item, in no particular order.
    pub async fn run(&self, items: Vec<SyncItem>) -> Vec<SyncItemResult> {
        let mut results = Vec::with_capacity(items.len());
        let (priced, mut quantity_batch): (Vec<_>, Vec<_>) =
            items.into_iter().partition(|i| i.price.is_some());

        if !priced.is_empty() {
            let updates: Vec<ListingUpdate> = priced.iter().map(SyncItem::as_update).collect();
            match self.run_feed(FeedKind::Price, &updates).await {
                FeedResult::Done => {
                    let checked: Vec<_> = stream::iter(priced)
                        .map(|item| async move {
                            let verdict = match item.price {
                                Some(target) => self
                                    .verify_price(&item.sku, target)
                                    .await
                                    .map_err(|observed| (target, observed)),
                                None => Ok(()),
                            };
                            (item, verdict)
                        })
                        .buffer_unordered(self.config.verify_concurrency.max(1))
                        .collect()
                        .await;

                    for (item, verdict) in checked {
                        match verdict {
                            Ok(()) if item.quantity.is_some() => quantity_batch.push(item),
                            Ok(()) => results.push(finish(item, SyncOutcome::Completed)),
                            Err((expected, observed)) => {
                                tracing::warn!(
                                    sku = %item.sku,
                                    %expected,
                                    observed = ?observed,
                                    "price not visible on live listing, holding quantity"
                                );
                                results.push(finish(
                                    item,
                                    SyncOutcome::PriceNotVerified { expected, observed },
                                ));
                            }
                        }
                    }
                }
                FeedResult::Failed(reason) => {
                    results.extend(priced.into_iter().map(|item| {
                        finish(
                            item,
                            SyncOutcome::PriceFeedFailed {
                                reason: reason.clone(),
                            },
                        )
                    }));
                }
                FeedResult::TimedOut => {
                    results.extend(
                        priced
                            .into_iter()
                            .map(|item| finish(item, SyncOutcome::PriceFeedTimeout)),
                    );
                }
            }
        }

        let (quantity_batch, negative): (Vec<_>, Vec<_>) = quantity_batch
            .into_iter()
            .partition(|i| i.quantity.is_none_or(|q| q >= 0));
        for item in negative {
            tracing::warn!(
                sku = %item.sku,
                quantity = ?item.quantity,
                "negative quantity left out of feed"
            );
            let reason = format!("negative quantity {}", item.quantity.unwrap_or_default());
            results.push(finish(item, SyncOutcome::QuantityFeedFailed { reason }));
        }

        if !quantity_batch.is_empty() {
            let updates: Vec<ListingUpdate> =
                quantity_batch.iter().map(SyncItem::as_update).collect();
            let outcome = match self.run_feed(FeedKind::Quantity, &updates).await {
                FeedResult::Done => SyncOutcome::Completed,
                FeedResult::Failed(reason) => SyncOutcome::QuantityFeedFailed { reason },
                FeedResult::TimedOut => SyncOutcome::QuantityFeedFailed {
                    reason: "feed did not finish in time".to_owned(),
                },
            };
            results.extend(
                quantity_batch
                    .into_iter()
                    .map(|item| finish(item, outcome.clone())),
            );
        }

        let completed = results.iter().filter(|r| r.outcome.is_success()).count();
        tracing::info!(
            items = results.len(),
            completed,
            failed = results.len() - completed,
            "Amazon two-phase sync finished"
        );
        results
    }

    async fn run_feed(&self, kind: FeedKind, updates: &[ListingUpdate]) -> FeedResult {
        let feed_id = match self.gateway.submit_feed(kind, updates).await {
            Ok(id) => id,
            Err(e) => return FeedResult::Failed(e.to_string()),
        };

        for poll in 1..=self.config.max_polls {
            tokio::time::sleep(self.config.poll_interval).await;
            match self.gateway.feed_status(&feed_id).await {
                Ok(FeedProcessingStatus::Done) => return FeedResult::Done,
                Ok(status) if status.is_terminal() => {
                    return FeedResult::Failed(format!("feed {feed_id} ended {status:?}"));
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(feed_id = %feed_id, poll, error = %e, "feed status check failed");
                }
            }
        }

        tracing::warn!(feed_id = %feed_id, kind = kind.as_str(), "feed polling budget exhausted");
        FeedResult::TimedOut
    }

    /// `Err` carries the last live price seen, if any.
    async fn verify_price(&self, sku: &str, target: Decimal) -> Result<(), Option<Decimal>> {
        let mut observed = None;
        for attempt in 1..=self.config.verify_attempts {
            match self.gateway.listing_price(sku).await {
                Ok(Some(live)) => {
                    if (live - target).abs() <= self.config.price_tolerance {
                        return Ok(());
                    }
                    observed = Some(live);
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(sku, attempt, error = %e, "live price read failed");
                }
            }
            if attempt < self.config.verify_attempts {
                tokio::time::sleep(self.config.verify_interval).await;
            }
        }
        Err(observed)
    }
}

fn finish(item: SyncItem, outcome: SyncOutcome) -> SyncItemResult {
    SyncItemResult {
        id: item.id,
        sku: item.sku,
        outcome,
    }
}

#[cfg(test)]
#[path = "two_phase_test.rs"]
mod tests;
