//! Shared request plumbing for the marketplace clients.

use std::time::Duration;

use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;

use crate::error::MarketplaceError;

pub(crate) fn build_client(timeout_secs: u64, user_agent: &str) -> Result<Client, MarketplaceError> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .user_agent(user_agent)
        .build()?)
}

/// Parses `base_url` with a trailing slash so relative joins append.
pub(crate) fn parse_base_url(base_url: &str) -> Result<Url, MarketplaceError> {
    let normalised = format!("{}/", base_url.trim_end_matches('/'));
    Url::parse(&normalised).map_err(|e| MarketplaceError::InvalidBaseUrl {
        base_url: base_url.to_owned(),
        reason: e.to_string(),
    })
}

pub(crate) fn join(base: &Url, path: &str) -> Result<Url, MarketplaceError> {
    base.join(path).map_err(|e| MarketplaceError::InvalidBaseUrl {
        base_url: base.to_string(),
        reason: e.to_string(),
    })
}

/// Maps non-2xx responses to [`MarketplaceError`], keeping a short body
/// excerpt as the message.
pub(crate) async fn check_status(
    service: &'static str,
    response: Response,
) -> Result<Response, MarketplaceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let url = response.url().to_string();
    let body = response.text().await.unwrap_or_default();
    let message: String = body.chars().take(300).collect();

    Err(match status {
        StatusCode::NOT_FOUND => MarketplaceError::NotFound { service, url },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            MarketplaceError::Auth { service, message }
        }
        _ => MarketplaceError::Api {
            service,
            status: status.as_u16(),
            message,
        },
    })
}

pub(crate) async fn read_json<T: DeserializeOwned>(
    response: Response,
    context: &str,
) -> Result<T, MarketplaceError> {
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| MarketplaceError::Deserialize {
        context: context.to_owned(),
        source: e,
    })
}
