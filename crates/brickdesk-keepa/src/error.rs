use thiserror::Error;

#[derive(Debug, Error)]
pub enum KeepaError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to deserialize Keepa response ({context}): {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// Keepa returned 200 with an `error` object in the body.
    #[error("Keepa API error: {0}")]
    Api(String),

    #[error("Keepa rate limit persisted after {attempts} attempts")]
    RateLimited { attempts: u32 },

    #[error("unexpected HTTP {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("Keepa accepts at most {max} identifiers per request, got {len}")]
    BatchTooLarge { len: usize, max: usize },

    #[error("invalid Keepa base URL {base_url}: {reason}")]
    InvalidBaseUrl { base_url: String, reason: String },
}
