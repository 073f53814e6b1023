use thiserror::Error;

#[derive(Debug, Error)]
pub enum BricqerError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("rate limited by Bricqer (retry after {retry_after_secs:?}s)")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Bricqer server error {status} from {url}")]
    ServerError { status: u16, url: String },

    #[error("endpoint not found: {url}")]
    NotFound { url: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("pagination limit reached for {resource}: exceeded {max_pages} pages")]
    PaginationLimit { resource: String, max_pages: usize },

    #[error("invalid base URL \"{base_url}\": {reason}")]
    InvalidBaseUrl { base_url: String, reason: String },

    #[error("normalization error for order {order_id}: {reason}")]
    Normalization { order_id: String, reason: String },
}
