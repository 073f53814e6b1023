use thiserror::Error;

#[derive(Debug, Error)]
pub enum MarketplaceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to deserialize {context} response: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{service} authentication failed: {message}")]
    Auth {
        service: &'static str,
        message: String,
    },

    #[error("{service} returned HTTP {status}: {message}")]
    Api {
        service: &'static str,
        status: u16,
        message: String,
    },

    #[error("{service} resource not found: {url}")]
    NotFound { service: &'static str, url: String },

    #[error("invalid base URL {base_url}: {reason}")]
    InvalidBaseUrl { base_url: String, reason: String },

    #[error("invalid {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },

    #[error("failed to normalize {service} order {order_id}: {reason}")]
    Normalization {
        service: &'static str,
        order_id: String,
        reason: String,
    },
}
