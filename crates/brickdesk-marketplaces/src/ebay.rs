//! eBay Sell Inventory API: offer publishing.

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;

use brickdesk_core::{EbayConfig, HttpConfig};

use crate::error::MarketplaceError;
use crate::http::{build_client, join, parse_base_url, read_json};

const SERVICE: &str = "eBay";

/// Turns a staged eBay offer into a live listing.
#[async_trait]
pub trait ListingPublisher: Send + Sync {
    /// Publishes `offer_id` and returns the new listing id.
    async fn publish(&self, offer_id: &str) -> Result<String, MarketplaceError>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublishResponse {
    listing_id: String,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    errors: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorDetail {
    #[serde(default)]
    error_id: Option<i64>,
    #[serde(default)]
    message: Option<String>,
}

fn describe_errors(body: &str) -> String {
    let envelope: ErrorEnvelope = serde_json::from_str(body).unwrap_or_default();
    let parts: Vec<String> = envelope
        .errors
        .iter()
        .map(|e| match (e.error_id, e.message.as_deref()) {
            (Some(id), Some(m)) => format!("{id}: {m}"),
            (None, Some(m)) => m.to_owned(),
            (Some(id), None) => format!("error {id}"),
            (None, None) => "unknown error".to_owned(),
        })
        .collect();
    if parts.is_empty() {
        body.chars().take(300).collect()
    } else {
        parts.join("; ")
    }
}

#[derive(Debug, Clone)]
pub struct EbayClient {
    client: Client,
    base_url: Url,
    access_token: String,
}

impl EbayClient {
    /// # Errors
    ///
    /// Returns [`MarketplaceError::InvalidBaseUrl`] or [`MarketplaceError::Http`].
    pub fn new(
        base_url: &str,
        access_token: &str,
        timeout_secs: u64,
        user_agent: &str,
    ) -> Result<Self, MarketplaceError> {
        Ok(Self {
            client: build_client(timeout_secs, user_agent)?,
            base_url: parse_base_url(base_url)?,
            access_token: access_token.to_owned(),
        })
    }

    /// # Errors
    ///
    /// See [`EbayClient::new`].
    pub fn from_config(config: &EbayConfig, http: &HttpConfig) -> Result<Self, MarketplaceError> {
        Self::new(
            &config.base_url,
            &config.access_token,
            http.timeout_secs,
            &http.user_agent,
        )
    }

    /// `POST /sell/inventory/v1/offer/{offerId}/publish`.
    ///
    /// # Errors
    ///
    /// Returns [`MarketplaceError::InvalidInput`] for a blank offer id,
    /// [`MarketplaceError::Auth`] on 401/403, or [`MarketplaceError::Api`]
    /// carrying eBay's error list.
    pub async fn publish_offer(&self, offer_id: &str) -> Result<String, MarketplaceError> {
        let offer_id = offer_id.trim();
        if offer_id.is_empty() {
            return Err(MarketplaceError::InvalidInput {
                field: "offer_id",
                reason: "offer id is empty".to_owned(),
            });
        }

        let mut url = join(&self.base_url, "sell/inventory/v1/offer")?;
        let base = url.to_string();
        url.path_segments_mut()
            .map_err(|()| MarketplaceError::InvalidBaseUrl {
                base_url: base,
                reason: "URL cannot carry path segments".to_owned(),
            })?
            .push(offer_id)
            .push("publish");

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.access_token)
            .header(reqwest::header::CONTENT_LANGUAGE, "en-GB")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = describe_errors(&body);
            return Err(if status.as_u16() == 401 || status.as_u16() == 403 {
                MarketplaceError::Auth {
                    service: SERVICE,
                    message,
                }
            } else {
                MarketplaceError::Api {
                    service: SERVICE,
                    status: status.as_u16(),
                    message,
                }
            });
        }

        let published: PublishResponse = read_json(response, "eBay publishOffer").await?;
        tracing::info!(offer_id, listing_id = %published.listing_id, "published eBay offer");
        Ok(published.listing_id)
    }
}

#[async_trait]
impl ListingPublisher for EbayClient {
    async fn publish(&self, offer_id: &str) -> Result<String, MarketplaceError> {
        self.publish_offer(offer_id).await
    }
}
