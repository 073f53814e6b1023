pub mod app_config;
pub mod arbitrage;
pub mod config;
pub mod pricing;
pub mod records;
pub mod rrp;
pub mod status;

use thiserror::Error;

pub use app_config::{
    AmazonConfig, AppConfig, BricqerConfig, EbayConfig, Environment, HttpConfig, KeepaConfig,
};
pub use arbitrage::{evaluate_arbitrage, ArbitrageConfig, ArbitragePrices, ArbitrageResult};
pub use config::{build_app_config, load_app_config, load_app_config_from_env};
pub use pricing::{
    calculate_best_offer_thresholds, calculate_profit, calculate_recommended_price,
    evaluate_thresholds, round_to_charm_price, BestOfferThresholds, MinifigMarketData,
    PricingConfig, ProfitBreakdown, ThresholdEvaluation,
};
pub use records::{CatalogSet, MinifigInventoryItem, NewPlatformOrder};
pub use rrp::{keepa_p95_proxy, percentile, regional_rrp, MIN_RRP_GBP};
pub use status::{
    DiscoveryStatus, InventoryStatus, ListingStatus, OrderStatus, Platform, UnknownStatus,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
