//! Keepa product API client, buy-box price history, and ASIN discovery.
//!
//! Keepa meters requests with a token bucket. The client remembers the last
//! `tokensLeft` / `refillIn` it saw and waits for a refill before spending
//! tokens it does not have.

pub mod client;
pub mod discovery;
pub mod error;
pub mod history;
pub mod types;

pub use client::{KeepaClient, ProductSource, RateLimitPolicy, MAX_IDENTIFIERS};
pub use discovery::{
    base_set_number, discover, match_by_codes, match_by_title, search_term, DiscoveryCandidate,
    DiscoveryMatch, DiscoveryOutcome, MatchMethod, CODE_BATCH_SIZE,
};
pub use error::KeepaError;
pub use history::{
    extract_prices, keepa_minutes_to_datetime, parse_price_history, PriceSummary,
    BUY_BOX_INDEX, KEEPA_EPOCH_MINUTES,
};
pub use types::{KeepaProduct, KeepaStats};
