//! Wire types for the Bricqer REST API.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;

/// Paginated list envelope. `next` is an absolute URL, or `null` on the last page.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    pub count: u64,
    pub next: Option<String>,
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BricqerOrder {
    pub id: i64,
    #[serde(default)]
    pub order_number: Option<String>,
    pub status: String,
    pub created: DateTime<Utc>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub items: Vec<BricqerOrderLine>,
    #[serde(default)]
    pub subtotal: Option<Decimal>,
    #[serde(default)]
    pub shipping_cost: Option<Decimal>,
    #[serde(default)]
    pub fees: Option<Decimal>,
    #[serde(default)]
    pub total: Option<Decimal>,
    #[serde(default)]
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BricqerOrderLine {
    #[serde(default)]
    pub quantity: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BricqerInventoryItem {
    pub id: i64,
    /// `minifig`, `part`, `set`, ...
    pub item_type: String,
    #[serde(default)]
    pub bricklink_id: Option<String>,
    pub name: String,
    /// `N` (new) or `U` (used).
    pub condition: String,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub purchase_price: Option<Decimal>,
    #[serde(default)]
    pub quantity: i32,
}
