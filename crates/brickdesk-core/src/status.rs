//! Status and platform enums shared by the database layer, the sync services,
//! and the HTTP API. Every enum round-trips through the string stored in SQL.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown {kind} value: {value}")]
pub struct UnknownStatus {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! sql_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            #[must_use]
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = UnknownStatus;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(UnknownStatus {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

/// Lifecycle of a physical stock item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InventoryStatus {
    Backlog,
    Listed,
    Sold,
}

sql_enum!(InventoryStatus, "inventory status", {
    Backlog => "BACKLOG",
    Listed => "LISTED",
    Sold => "SOLD",
});

impl InventoryStatus {
    /// Allowed moves: BACKLOG → LISTED, LISTED → SOLD, LISTED → BACKLOG (delist).
    /// SOLD is terminal.
    #[must_use]
    pub fn can_transition_to(self, next: InventoryStatus) -> bool {
        matches!(
            (self, next),
            (Self::Backlog, Self::Listed) | (Self::Listed, Self::Sold | Self::Backlog)
        )
    }
}

/// Lifecycle of a minifig listing pushed from Bricqer stock to eBay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ListingStatus {
    NotListed,
    Staged,
    Publishing,
    Published,
    Sold,
}

sql_enum!(ListingStatus, "listing status", {
    NotListed => "NOT_LISTED",
    Staged => "STAGED",
    Publishing => "PUBLISHING",
    Published => "PUBLISHED",
    Sold => "SOLD",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Amazon,
    Ebay,
    Bricklink,
    Brickowl,
    Bricqer,
    Vinted,
}

sql_enum!(Platform, "platform", {
    Amazon => "amazon",
    Ebay => "ebay",
    Bricklink => "bricklink",
    Brickowl => "brickowl",
    Bricqer => "bricqer",
    Vinted => "vinted",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Paid,
    Packed,
    Shipped,
    Completed,
    Cancelled,
    Refunded,
}

sql_enum!(OrderStatus, "order status", {
    Pending => "pending",
    Paid => "paid",
    Packed => "packed",
    Shipped => "shipped",
    Completed => "completed",
    Cancelled => "cancelled",
    Refunded => "refunded",
});

/// Outcome of ASIN discovery for a catalogue set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryStatus {
    Pending,
    Found,
    NotFound,
    Multiple,
    Error,
}

sql_enum!(DiscoveryStatus, "discovery status", {
    Pending => "pending",
    Found => "found",
    NotFound => "not_found",
    Multiple => "multiple",
    Error => "error",
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inventory_transitions_follow_backlog_listed_sold() {
        use InventoryStatus::{Backlog, Listed, Sold};
        assert!(Backlog.can_transition_to(Listed));
        assert!(Listed.can_transition_to(Sold));
        assert!(Listed.can_transition_to(Backlog));
        assert!(!Backlog.can_transition_to(Sold));
        assert!(!Sold.can_transition_to(Listed));
        assert!(!Sold.can_transition_to(Backlog));
        assert!(!Listed.can_transition_to(Listed));
    }

    #[test]
    fn listing_status_parses_sql_form() {
        assert_eq!(
            "PUBLISHING".parse::<ListingStatus>().unwrap(),
            ListingStatus::Publishing
        );
        assert_eq!(ListingStatus::NotListed.as_str(), "NOT_LISTED");
    }

    #[test]
    fn unknown_value_reports_kind() {
        let err = "teleported".parse::<OrderStatus>().unwrap_err();
        assert_eq!(err.kind, "order status");
        assert_eq!(err.value, "teleported");
    }

    #[test]
    fn serde_matches_sql_form() {
        let json = serde_json::to_string(&DiscoveryStatus::NotFound).unwrap();
        assert_eq!(json, "\"not_found\"");
        let json = serde_json::to_string(&InventoryStatus::Backlog).unwrap();
        assert_eq!(json, "\"BACKLOG\"");
    }
}
