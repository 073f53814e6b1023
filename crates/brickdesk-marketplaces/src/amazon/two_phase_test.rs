use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::*;
use crate::error::MarketplaceError;

#[derive(Default)]
struct FakeGateway {
    submitted: Mutex<Vec<(FeedKind, Vec<String>)>>,
    price_status: Option<FeedProcessingStatus>,
    quantity_status: Option<FeedProcessingStatus>,
    reject_submit: Option<FeedKind>,
    live_prices: HashMap<String, Decimal>,
}

impl FakeGateway {
    fn done() -> Self {
        Self {
            price_status: Some(FeedProcessingStatus::Done),
            quantity_status: Some(FeedProcessingStatus::Done),
            ..Self::default()
        }
    }

    fn with_live(mut self, sku: &str, price: Decimal) -> Self {
        self.live_prices.insert(sku.to_owned(), price);
        self
    }

    fn submitted(&self) -> Vec<(FeedKind, Vec<String>)> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl ListingsGateway for FakeGateway {
    async fn submit_feed(
        &self,
        kind: FeedKind,
        updates: &[ListingUpdate],
    ) -> Result<String, MarketplaceError> {
        if self.reject_submit == Some(kind) {
            return Err(MarketplaceError::Api {
                service: "Amazon SP-API",
                status: 400,
                message: "InvalidInput".to_owned(),
            });
        }
        self.submitted
            .lock()
            .unwrap()
            .push((kind, updates.iter().map(|u| u.sku.clone()).collect()));
        Ok(format!("feed-{}", kind.as_str()))
    }

    async fn feed_status(&self, feed_id: &str) -> Result<FeedProcessingStatus, MarketplaceError> {
        let status = if feed_id == "feed-price" {
            self.price_status
        } else {
            self.quantity_status
        };
        Ok(status.unwrap_or(FeedProcessingStatus::InProgress))
    }

    async fn listing_price(&self, sku: &str) -> Result<Option<Decimal>, MarketplaceError> {
        Ok(self.live_prices.get(sku).copied())
    }
}

fn fast_config() -> TwoPhaseConfig {
    TwoPhaseConfig {
        poll_interval: Duration::ZERO,
        max_polls: 3,
        verify_interval: Duration::ZERO,
        verify_attempts: 2,
        verify_concurrency: 4,
        price_tolerance: Decimal::new(5, 3),
    }
}

fn item(id: i64, sku: &str, price: Option<Decimal>, quantity: Option<i32>) -> SyncItem {
    SyncItem {
        id,
        sku: sku.to_owned(),
        price,
        quantity,
    }
}

fn outcome_for(results: &[SyncItemResult], id: i64) -> &SyncOutcome {
    &results.iter().find(|r| r.id == id).unwrap().outcome
}

#[tokio::test]
async fn verified_price_releases_quantity() {
    let gateway = FakeGateway::done().with_live("A", Decimal::new(1999, 2));
    let sync = TwoPhaseSync::new(&gateway, fast_config());

    let results = sync
        .run(vec![item(1, "A", Some(Decimal::new(1999, 2)), Some(4))])
        .await;

    assert_eq!(outcome_for(&results, 1), &SyncOutcome::Completed);
    let submitted = gateway.submitted();
    assert_eq!(submitted.len(), 2);
    assert_eq!(submitted[0], (FeedKind::Price, vec!["A".to_owned()]));
    assert_eq!(submitted[1], (FeedKind::Quantity, vec!["A".to_owned()]));
}

#[tokio::test]
async fn unverified_price_never_sends_quantity() {
    let gateway = FakeGateway::done()
        .with_live("A", Decimal::new(2499, 2))
        .with_live("B", Decimal::new(1000, 2));
    let sync = TwoPhaseSync::new(&gateway, fast_config());

    let results = sync
        .run(vec![
            item(1, "A", Some(Decimal::new(1999, 2)), Some(4)),
            item(2, "B", Some(Decimal::new(1000, 2)), Some(1)),
        ])
        .await;

    assert_eq!(
        outcome_for(&results, 1),
        &SyncOutcome::PriceNotVerified {
            expected: Decimal::new(1999, 2),
            observed: Some(Decimal::new(2499, 2)),
        }
    );
    assert_eq!(outcome_for(&results, 2), &SyncOutcome::Completed);

    let submitted = gateway.submitted();
    assert_eq!(submitted[1], (FeedKind::Quantity, vec!["B".to_owned()]));
}

#[tokio::test]
async fn price_within_tolerance_verifies() {
    let gateway = FakeGateway::done().with_live("A", Decimal::new(19_994, 3));
    let sync = TwoPhaseSync::new(&gateway, fast_config());
    let results = sync.run(vec![item(1, "A", Some(Decimal::new(1999, 2)), None)]).await;
    assert_eq!(outcome_for(&results, 1), &SyncOutcome::Completed);
    assert_eq!(gateway.submitted().len(), 1, "price-only items send no quantity feed");
}

#[tokio::test]
async fn fatal_price_feed_fails_priced_items_only() {
    let gateway = FakeGateway {
        price_status: Some(FeedProcessingStatus::Fatal),
        quantity_status: Some(FeedProcessingStatus::Done),
        ..FakeGateway::default()
    };
    let sync = TwoPhaseSync::new(&gateway, fast_config());

    let results = sync
        .run(vec![
            item(1, "A", Some(Decimal::new(1999, 2)), Some(4)),
            item(2, "Q", None, Some(7)),
        ])
        .await;

    assert!(matches!(
        outcome_for(&results, 1),
        SyncOutcome::PriceFeedFailed { .. }
    ));
    assert_eq!(outcome_for(&results, 2), &SyncOutcome::Completed);
    let submitted = gateway.submitted();
    assert_eq!(submitted[1], (FeedKind::Quantity, vec!["Q".to_owned()]));
}

#[tokio::test]
async fn price_feed_that_never_finishes_times_out() {
    let gateway = FakeGateway::default();
    let sync = TwoPhaseSync::new(&gateway, fast_config());
    let results = sync.run(vec![item(1, "A", Some(Decimal::ONE), Some(1))]).await;
    assert_eq!(outcome_for(&results, 1), &SyncOutcome::PriceFeedTimeout);
    assert_eq!(gateway.submitted().len(), 1);
}

#[tokio::test]
async fn rejected_quantity_feed_is_reported() {
    let gateway = FakeGateway {
        reject_submit: Some(FeedKind::Quantity),
        ..FakeGateway::done()
    };
    let sync = TwoPhaseSync::new(&gateway, fast_config());
    let results = sync.run(vec![item(3, "Q", None, Some(2))]).await;

    let outcome = outcome_for(&results, 3);
    assert!(matches!(outcome, SyncOutcome::QuantityFeedFailed { .. }));
    assert_eq!(outcome.as_str(), "quantity_feed_failed");
    assert!(outcome.error_message().unwrap().contains("InvalidInput"));
}

#[test]
fn outcome_messages() {
    assert!(SyncOutcome::Completed.error_message().is_none());
    let msg = SyncOutcome::PriceNotVerified {
        expected: Decimal::new(1999, 2),
        observed: None,
    }
    .error_message()
    .unwrap();
    assert!(msg.contains("19.99"));
}

#[tokio::test]
async fn negative_quantity_fails_only_that_item() {
    let gateway = FakeGateway::done();
    let sync = TwoPhaseSync::new(&gateway, fast_config());

    let results = sync
        .run(vec![
            item(1, "GOOD", None, Some(3)),
            item(2, "BAD", None, Some(-1)),
            item(3, "ALSO-GOOD", None, Some(0)),
        ])
        .await;

    assert_eq!(outcome_for(&results, 1), &SyncOutcome::Completed);
    assert_eq!(outcome_for(&results, 3), &SyncOutcome::Completed);
    let bad = outcome_for(&results, 2);
    assert!(matches!(bad, SyncOutcome::QuantityFeedFailed { reason } if reason.contains("-1")));

    let submitted = gateway.submitted();
    assert_eq!(submitted.len(), 1);
    assert_eq!(
        submitted[0],
        (FeedKind::Quantity, vec!["GOOD".to_owned(), "ALSO-GOOD".to_owned()])
    );
}

#[tokio::test]
async fn live_prices_are_checked_concurrently() {
    let gateway = FakeGateway::done();
    let config = TwoPhaseConfig {
        verify_interval: Duration::from_millis(100),
        verify_attempts: 3,
        verify_concurrency: 8,
        ..fast_config()
    };
    let sync = TwoPhaseSync::new(&gateway, config);
    let items: Vec<SyncItem> = (0..8)
        .map(|n| item(n, &format!("SKU-{n}"), Some(Decimal::TEN), Some(1)))
        .collect();

    let started = std::time::Instant::now();
    let results = sync.run(items).await;

    // Each SKU waits 200ms between its reads; one at a time would take 1.6s.
    assert!(started.elapsed() < Duration::from_millis(1000));
    assert_eq!(results.len(), 8);
    assert!(results
        .iter()
        .all(|r| matches!(r.outcome, SyncOutcome::PriceNotVerified { observed: None, .. })));
    assert_eq!(gateway.submitted().len(), 1, "no quantity feed for unverified prices");
}

#[tokio::test]
async fn cancelled_price_feed_fails() {
    let gateway = FakeGateway {
        price_status: Some(FeedProcessingStatus::Cancelled),
        ..FakeGateway::default()
    };
    let sync = TwoPhaseSync::new(&gateway, fast_config());
    let results = sync.run(vec![item(1, "A", Some(Decimal::ONE), None)]).await;
    assert!(matches!(
        outcome_for(&results, 1),
        SyncOutcome::PriceFeedFailed { reason } if reason.contains("Cancelled")
    ));
}

#[test]
fn terminal_feed_statuses() {
    assert!(FeedProcessingStatus::Done.is_terminal());
    assert!(FeedProcessingStatus::Fatal.is_terminal());
    assert!(FeedProcessingStatus::Cancelled.is_terminal());
    assert!(!FeedProcessingStatus::InQueue.is_terminal());
    assert!(!FeedProcessingStatus::InProgress.is_terminal());
}
