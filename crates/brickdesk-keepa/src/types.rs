//! Wire types for the Keepa `/product` and `/search` endpoints.

use serde::Deserialize;

/// Response envelope shared by `/product` and `/search`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProductResponse {
    #[serde(default)]
    pub tokens_left: Option<i64>,
    #[serde(default)]
    pub refill_in: Option<u64>,
    #[serde(default)]
    pub products: Vec<KeepaProduct>,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

/// Body Keepa sends with HTTP 429.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RateLimitBody {
    #[serde(default)]
    pub refill_in: Option<u64>,
    #[serde(default)]
    pub tokens_left: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeepaProduct {
    pub asin: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub ean_list: Option<Vec<String>>,
    #[serde(default)]
    pub upc_list: Option<Vec<String>>,
    /// Price histories indexed by Keepa CSV type. Each entry is
    /// `[keepa_minute, value, keepa_minute, value, ...]` or null.
    #[serde(default)]
    pub csv: Option<Vec<Option<Vec<i64>>>>,
    #[serde(default)]
    pub stats: Option<KeepaStats>,
}

impl KeepaProduct {
    pub(crate) fn has_ean(&self, code: &str) -> bool {
        self.ean_list
            .as_deref()
            .is_some_and(|list| list.iter().any(|c| c == code))
    }

    pub(crate) fn has_upc(&self, code: &str) -> bool {
        self.upc_list
            .as_deref()
            .is_some_and(|list| list.iter().any(|c| c == code))
    }
}

/// Aggregates returned when a request sets `stats=<days>`. Arrays are indexed
/// by CSV type; `-1` means no data.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeepaStats {
    #[serde(default)]
    pub current: Option<Vec<Option<i64>>>,
    #[serde(default)]
    pub avg90: Option<Vec<Option<i64>>>,
}

/// Renders Keepa's `error` object (`{type, message, details}`) as one line.
pub(crate) fn describe_api_error(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Object(map) => map
            .get("message")
            .and_then(serde_json::Value::as_str)
            .or_else(|| map.get("type").and_then(serde_json::Value::as_str))
            .map_or_else(|| value.to_string(), str::to_owned),
        other => other.to_string(),
    }
}
