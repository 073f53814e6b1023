//! Offline tests for brickdesk-db pool configuration and row helpers.
//! These tests do not require a live database connection.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use brickdesk_core::{AppConfig, Environment, HttpConfig, InventoryStatus};
use brickdesk_db::{ArbitrageCandidateRow, DbError, InventoryItemRow, PoolConfig};
use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let app_config = AppConfig {
        database_url: "postgres://example".to_string(),
        env: Environment::Test,
        bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000),
        log_level: "info".to_string(),
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
        http: HttpConfig {
            timeout_secs: 30,
            user_agent: "ua".to_string(),
            max_retries: 3,
            backoff_base_ms: 1000,
        },
        sync_timeout_secs: 60,
        full_sync_cron: "0 0 6,18 * * *".to_string(),
        sync_user_id: None,
        notify_webhook_url: None,
        bricqer: None,
        keepa: None,
        amazon: None,
        ebay: None,
        brickowl_api_key: None,
        brickset_api_key: None,
    };

    let pool_config = PoolConfig::from_app_config(&app_config);
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

fn inventory_row(status: &str) -> InventoryItemRow {
    InventoryItemRow {
        id: 1,
        user_id: Uuid::nil(),
        purchase_id: Some(1),
        set_number: "75192-1".to_string(),
        item_name: None,
        condition: "new".to_string(),
        status: status.to_string(),
        cost: Decimal::new(40000, 2),
        sku: None,
        listing_platform: None,
        listing_price: None,
        sold_price: None,
        sold_at: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

#[test]
fn inventory_row_parses_status() {
    assert_eq!(
        inventory_row("LISTED").status().unwrap(),
        InventoryStatus::Listed
    );
    assert!(matches!(
        inventory_row("LOST").status(),
        Err(DbError::Corrupt(_))
    ));
}

#[test]
fn arbitrage_candidate_exposes_prices() {
    let row = ArbitrageCandidateRow {
        set_number: "10294-1".to_string(),
        set_name: "Titanic".to_string(),
        asin: "B09BNWS8QW".to_string(),
        uk_retail_price: Some(Decimal::new(59999, 2)),
        amazon_price: Some(Decimal::new(62000, 2)),
        bricklink_min_price: None,
        ebay_min_price: Some(Decimal::new(45000, 2)),
    };
    let prices = row.prices();
    assert_eq!(prices.amazon_price, row.amazon_price);
    assert_eq!(prices.ebay_min_price, row.ebay_min_price);
    assert!(prices.bricklink_min_price.is_none());
}
