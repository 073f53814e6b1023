use brickdesk_bricqer::BricqerError;
use brickdesk_db::DbError;
use brickdesk_keepa::KeepaError;
use brickdesk_marketplaces::MarketplaceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Bricqer(#[from] BricqerError),

    #[error(transparent)]
    Keepa(#[from] KeepaError),

    #[error(transparent)]
    Marketplace(#[from] MarketplaceError),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Another caller changed the row first.
    #[error("{0}")]
    Conflict(String),

    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("notification webhook answered HTTP {status}")]
    Notify { status: u16 },
}
