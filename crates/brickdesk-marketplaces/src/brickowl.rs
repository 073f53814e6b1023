//! Brick Owl store API: orders.

use chrono::{DateTime, Utc};
use reqwest::{Client, Url};
use rust_decimal::Decimal;
use serde::Deserialize;

use brickdesk_core::{HttpConfig, NewPlatformOrder, OrderStatus, Platform};

use crate::error::MarketplaceError;
use crate::http::{build_client, check_status, join, parse_base_url, read_json};

const DEFAULT_BASE_URL: &str = "https://api.brickowl.com/v1";
const SERVICE: &str = "Brick Owl";

/// An entry from `GET /order/list`. Brick Owl sends numbers as strings.
#[derive(Debug, Clone, Deserialize)]
pub struct BrickOwlOrder {
    pub order_id: String,
    /// Unix seconds.
    pub order_date: String,
    pub status: String,
    #[serde(default)]
    pub total_quantity: Option<String>,
    #[serde(default)]
    pub sub_total: Option<Decimal>,
    #[serde(default)]
    pub total_shipping: Option<Decimal>,
    #[serde(default)]
    pub base_order_total: Option<Decimal>,
    #[serde(default)]
    pub buyer_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BrickOwlClient {
    client: Client,
    base_url: Url,
    api_key: String,
}

impl BrickOwlClient {
    /// # Errors
    ///
    /// Returns [`MarketplaceError::Http`] if the client cannot be built.
    pub fn new(api_key: &str, http: &HttpConfig) -> Result<Self, MarketplaceError> {
        Self::with_base_url(api_key, http, DEFAULT_BASE_URL)
    }

    /// # Errors
    ///
    /// Returns [`MarketplaceError::InvalidBaseUrl`] or [`MarketplaceError::Http`].
    pub fn with_base_url(
        api_key: &str,
        http: &HttpConfig,
        base_url: &str,
    ) -> Result<Self, MarketplaceError> {
        Ok(Self {
            client: build_client(http.timeout_secs, &http.user_agent)?,
            base_url: parse_base_url(base_url)?,
            api_key: api_key.to_owned(),
        })
    }

    /// # Errors
    ///
    /// Returns any transport, status, or decode error.
    pub async fn list_orders(&self) -> Result<Vec<BrickOwlOrder>, MarketplaceError> {
        let url = join(&self.base_url, "order/list")?;
        let response = self
            .client
            .get(url)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await?;
        let response = check_status(SERVICE, response).await?;
        let orders: Vec<BrickOwlOrder> = read_json(response, "Brick Owl order list").await?;
        tracing::debug!(orders = orders.len(), "fetched Brick Owl orders");
        Ok(orders)
    }
}

fn map_status(status: &str) -> Option<OrderStatus> {
    let mapped = match status.trim().to_ascii_lowercase().as_str() {
        "pending" | "payment submitted" | "on hold" => OrderStatus::Pending,
        "payment received" | "processing" => OrderStatus::Paid,
        "processed" => OrderStatus::Packed,
        "shipped" => OrderStatus::Shipped,
        "received" => OrderStatus::Completed,
        "cancelled" => OrderStatus::Cancelled,
        "refunded" => OrderStatus::Refunded,
        _ => return None,
    };
    Some(mapped)
}

/// # Errors
///
/// Returns [`MarketplaceError::Normalization`] for unknown statuses,
/// unparseable dates or quantities, or negative totals.
pub fn normalize_brickowl_order(order: &BrickOwlOrder) -> Result<NewPlatformOrder, MarketplaceError> {
    let fail = |reason: String| MarketplaceError::Normalization {
        service: SERVICE,
        order_id: order.order_id.clone(),
        reason,
    };

    let status = map_status(&order.status).ok_or_else(|| fail(format!("unknown status '{}'", order.status)))?;

    let order_date = order
        .order_date
        .trim()
        .parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .ok_or_else(|| fail(format!("invalid order_date '{}'", order.order_date)))?;

    let item_count = match order.total_quantity.as_deref().map(str::trim) {
        None | Some("") => 0,
        Some(q) => q
            .parse::<i32>()
            .map_err(|_| fail(format!("invalid total_quantity '{q}'")))?,
    };

    let shipping = order.total_shipping.unwrap_or(Decimal::ZERO);
    let total = order.base_order_total.unwrap_or(Decimal::ZERO);
    let subtotal = order.sub_total.unwrap_or(total - shipping);

    if total.is_sign_negative() && !total.is_zero() {
        return Err(fail("negative order total".to_owned()));
    }

    Ok(NewPlatformOrder {
        platform: Platform::Brickowl,
        platform_order_id: order.order_id.clone(),
        status,
        order_date,
        buyer_name: order.buyer_name.clone(),
        item_count: item_count.max(0),
        subtotal,
        shipping,
        fees: Decimal::ZERO,
        total,
        currency: "GBP".to_owned(),
    })
}
