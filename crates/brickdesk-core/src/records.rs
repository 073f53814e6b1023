//! Normalised records produced by marketplace clients and persisted by the
//! database layer.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::status::{OrderStatus, Platform};

/// An order from any sales platform, reduced to the fields reporting needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPlatformOrder {
    pub platform: Platform,
    pub platform_order_id: String,
    pub status: OrderStatus,
    pub order_date: DateTime<Utc>,
    pub buyer_name: Option<String>,
    pub item_count: i32,
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub fees: Decimal,
    pub total: Decimal,
    pub currency: String,
}

/// A minifig held in Bricqer stock, candidate for an eBay listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinifigInventoryItem {
    pub bricqer_item_id: String,
    pub bricklink_id: Option<String>,
    pub name: String,
    pub condition: String,
    pub bricqer_price: Option<Decimal>,
    pub cost: Option<Decimal>,
    pub quantity: i32,
}

/// Catalogue entry returned by Brickset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogSet {
    pub set_number: String,
    pub set_name: String,
    pub theme: Option<String>,
    pub year: Option<i32>,
    pub ean: Option<String>,
    pub upc: Option<String>,
    pub uk_retail_price: Option<Decimal>,
    pub us_retail_price: Option<Decimal>,
    pub de_retail_price: Option<Decimal>,
}
