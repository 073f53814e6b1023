//! `JSON_LISTINGS_FEED` document construction.

use rust_decimal::prelude::ToPrimitive;
use serde_json::{json, Value};

use super::{FeedKind, ListingUpdate};
use crate::error::MarketplaceError;

pub const FEED_TYPE: &str = "JSON_LISTINGS_FEED";
const PRICE_PATH: &str = "/attributes/purchasable_offer";
const QUANTITY_PATH: &str = "/attributes/fulfillment_availability";

fn price_patch(marketplace_id: &str, update: &ListingUpdate) -> Result<Value, MarketplaceError> {
    let price = update.price.ok_or_else(|| MarketplaceError::InvalidInput {
        field: "price",
        reason: format!("SKU {} has no price for a price feed", update.sku),
    })?;
    let amount = price
        .round_dp(2)
        .to_f64()
        .ok_or_else(|| MarketplaceError::InvalidInput {
            field: "price",
            reason: format!("{price} is not representable"),
        })?;

    Ok(json!({
        "op": "replace",
        "path": PRICE_PATH,
        "value": [{
            "marketplace_id": marketplace_id,
            "currency": "GBP",
            "our_price": [{ "schedule": [{ "value_with_tax": amount }] }]
        }]
    }))
}

fn quantity_patch(update: &ListingUpdate) -> Result<Value, MarketplaceError> {
    let quantity = update.quantity.ok_or_else(|| MarketplaceError::InvalidInput {
        field: "quantity",
        reason: format!("SKU {} has no quantity for a quantity feed", update.sku),
    })?;
    if quantity < 0 {
        return Err(MarketplaceError::InvalidInput {
            field: "quantity",
            reason: format!("SKU {} has negative quantity {quantity}", update.sku),
        });
    }

    Ok(json!({
        "op": "replace",
        "path": QUANTITY_PATH,
        "value": [{ "fulfillment_channel_code": "DEFAULT", "quantity": quantity }]
    }))
}

/// Builds a listings feed with one `PATCH` message per update.
///
/// # Errors
///
/// Returns [`MarketplaceError::InvalidInput`] if an update lacks the field
/// the feed kind patches, or `updates` is empty.
pub fn build_listings_feed(
    seller_id: &str,
    marketplace_id: &str,
    kind: FeedKind,
    updates: &[ListingUpdate],
) -> Result<Value, MarketplaceError> {
    if updates.is_empty() {
        return Err(MarketplaceError::InvalidInput {
            field: "updates",
            reason: "a feed needs at least one message".to_owned(),
        });
    }

    let messages = updates
        .iter()
        .enumerate()
        .map(|(i, update)| {
            let patch = match kind {
                FeedKind::Price => price_patch(marketplace_id, update)?,
                FeedKind::Quantity => quantity_patch(update)?,
            };
            Ok(json!({
                "messageId": i + 1,
                "sku": update.sku,
                "operationType": "PATCH",
                "productType": "PRODUCT",
                "patches": [patch]
            }))
        })
        .collect::<Result<Vec<_>, MarketplaceError>>()?;

    Ok(json!({
        "header": { "sellerId": seller_id, "version": "2.0", "issueLocale": "en_GB" },
        "messages": messages
    }))
}
