//! Client for the Bricqer store-management REST API.
//!
//! Bricqer holds the business's BrickLink / Brick Owl stock and the orders
//! placed against it. The client retries transient failures with jittered
//! exponential backoff and spaces requests so bulk pagination stays inside
//! the tenant's rate limit.

pub mod client;
pub mod error;
pub mod normalize;
pub mod rate_limit;
pub mod retry;
pub mod types;

pub use client::BricqerClient;
pub use error::BricqerError;
pub use normalize::{map_order_status, normalize_inventory_item, normalize_order};
pub use rate_limit::RequestSpacer;
pub use retry::RetryPolicy;
pub use types::{BricqerInventoryItem, BricqerOrder, Page};
