//! Conversion of Bricqer wire types into platform-neutral records.

use rust_decimal::Decimal;

use brickdesk_core::{MinifigInventoryItem, NewPlatformOrder, OrderStatus, Platform};

use crate::error::BricqerError;
use crate::types::{BricqerInventoryItem, BricqerOrder};

/// Maps a Bricqer order status onto the shared order lifecycle.
///
/// Returns `None` for statuses this system does not track.
#[must_use]
pub fn map_order_status(status: &str) -> Option<OrderStatus> {
    let mapped = match status.trim().to_ascii_uppercase().as_str() {
        "NEW" | "PENDING" | "AWAITING_PAYMENT" => OrderStatus::Pending,
        "PAID" | "READY" | "PICKING" => OrderStatus::Paid,
        "PICKED" | "PACKED" => OrderStatus::Packed,
        "SHIPPED" | "DISPATCHED" => OrderStatus::Shipped,
        "COMPLETED" | "RECEIVED" => OrderStatus::Completed,
        "CANCELLED" | "CANCELED" => OrderStatus::Cancelled,
        "REFUNDED" => OrderStatus::Refunded,
        _ => return None,
    };
    Some(mapped)
}

/// Normalises a Bricqer order.
///
/// Missing money fields default to zero; a missing total is derived from
/// subtotal plus shipping.
///
/// # Errors
///
/// Returns [`BricqerError::Normalization`] for unknown statuses or negative
/// money values.
pub fn normalize_order(order: &BricqerOrder) -> Result<NewPlatformOrder, BricqerError> {
    let order_id = order
        .order_number
        .clone()
        .unwrap_or_else(|| order.id.to_string());

    let status = map_order_status(&order.status).ok_or_else(|| BricqerError::Normalization {
        order_id: order_id.clone(),
        reason: format!("unknown status '{}'", order.status),
    })?;

    let subtotal = order.subtotal.unwrap_or(Decimal::ZERO);
    let shipping = order.shipping_cost.unwrap_or(Decimal::ZERO);
    let fees = order.fees.unwrap_or(Decimal::ZERO);
    let total = order.total.unwrap_or(subtotal + shipping);

    if [subtotal, shipping, fees, total]
        .iter()
        .any(|v| v.is_sign_negative() && !v.is_zero())
    {
        return Err(BricqerError::Normalization {
            order_id,
            reason: "negative money value".to_string(),
        });
    }

    Ok(NewPlatformOrder {
        platform: Platform::Bricqer,
        platform_order_id: order_id,
        status,
        order_date: order.created,
        buyer_name: order.customer_name.clone(),
        item_count: order.items.iter().map(|l| l.quantity.max(0)).sum(),
        subtotal,
        shipping,
        fees,
        total,
        currency: order.currency.clone().unwrap_or_else(|| "GBP".to_string()),
    })
}

/// Returns the item as a minifig listing candidate, or `None` for any other
/// item type.
#[must_use]
pub fn normalize_inventory_item(item: &BricqerInventoryItem) -> Option<MinifigInventoryItem> {
    if !item.item_type.eq_ignore_ascii_case("minifig") {
        return None;
    }

    let condition = match item.condition.trim().to_ascii_uppercase().as_str() {
        "N" | "NEW" => "new",
        _ => "used",
    };

    Some(MinifigInventoryItem {
        bricqer_item_id: item.id.to_string(),
        bricklink_id: item.bricklink_id.clone(),
        name: item.name.clone(),
        condition: condition.to_string(),
        bricqer_price: item.price,
        cost: item.purchase_price,
        quantity: item.quantity.max(0),
    })
}
