//! Clients for the sales channels and catalogue services brickdesk talks to.
//!
//! - [`amazon`]: Selling Partner API feeds and listings, plus the two-phase
//!   price-then-quantity sync.
//! - [`ebay`]: Inventory API offer publishing.
//! - [`brickowl`]: order retrieval.
//! - [`brickset`]: set catalogue and retail prices.

pub mod amazon;
pub mod brickowl;
pub mod brickset;
pub mod ebay;
pub mod error;
mod http;

pub use amazon::{
    FeedKind, FeedProcessingStatus, ListingUpdate, ListingsGateway, SpApiClient, SyncItem,
    SyncItemResult, SyncOutcome, TwoPhaseConfig, TwoPhaseSync,
};
pub use brickowl::{normalize_brickowl_order, BrickOwlClient, BrickOwlOrder};
pub use brickset::{BricksetClient, BricksetPage, BricksetSet};
pub use ebay::{EbayClient, ListingPublisher};
pub use error::MarketplaceError;
