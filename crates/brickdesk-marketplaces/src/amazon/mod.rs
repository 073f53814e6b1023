//! Amazon Selling Partner API.

pub mod client;
pub mod feed;
pub mod two_phase;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::MarketplaceError;

pub use client::SpApiClient;
pub use feed::build_listings_feed;
pub use two_phase::{SyncItem, SyncItemResult, SyncOutcome, TwoPhaseConfig, TwoPhaseSync};

/// Which listing attribute a feed patches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedKind {
    Price,
    Quantity,
}

impl FeedKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Price => "price",
            Self::Quantity => "quantity",
        }
    }
}

/// `processingStatus` of a submitted feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeedProcessingStatus {
    InQueue,
    InProgress,
    Done,
    Fatal,
    Cancelled,
}

impl FeedProcessingStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Fatal | Self::Cancelled)
    }
}

/// One SKU's pending change. Feeds of [`FeedKind::Price`] read `price`,
/// feeds of [`FeedKind::Quantity`] read `quantity`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingUpdate {
    pub sku: String,
    pub price: Option<Decimal>,
    pub quantity: Option<i32>,
}

/// The SP-API calls the two-phase sync depends on.
#[async_trait]
pub trait ListingsGateway: Send + Sync {
    /// Uploads a listings feed and returns its feed id.
    async fn submit_feed(
        &self,
        kind: FeedKind,
        updates: &[ListingUpdate],
    ) -> Result<String, MarketplaceError>;

    async fn feed_status(&self, feed_id: &str) -> Result<FeedProcessingStatus, MarketplaceError>;

    /// Live B2C offer price for a seller SKU, `None` if the listing has no offer.
    async fn listing_price(&self, sku: &str) -> Result<Option<Decimal>, MarketplaceError>;
}
