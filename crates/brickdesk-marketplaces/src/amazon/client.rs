//! Selling Partner API client: LWA auth, feeds, and listing reads.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use rust_decimal::Decimal;
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::time::Instant;

use brickdesk_core::{AmazonConfig, HttpConfig};

use super::feed::{build_listings_feed, FEED_TYPE};
use super::{FeedKind, FeedProcessingStatus, ListingUpdate, ListingsGateway};
use crate::error::MarketplaceError;
use crate::http::{build_client, check_status, join, parse_base_url, read_json};

const DEFAULT_TOKEN_URL: &str = "https://api.amazon.com/auth/o2/token";
const FEED_CONTENT_TYPE: &str = "application/json; charset=UTF-8";
const SERVICE: &str = "Amazon SP-API";
const LWA_SERVICE: &str = "Amazon LWA";

/// Tokens are refreshed this long before Amazon says they expire.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedDocument {
    pub feed_document_id: String,
    pub url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateFeedResponse {
    feed_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feed {
    pub feed_id: String,
    pub processing_status: FeedProcessingStatus,
    #[serde(default)]
    pub result_feed_document_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListingItem {
    #[serde(default)]
    offers: Vec<ListingOffer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListingOffer {
    #[serde(default)]
    offer_type: Option<String>,
    #[serde(default)]
    price: Option<Money>,
}

#[derive(Debug, Deserialize)]
struct Money {
    amount: Decimal,
}

#[derive(Debug, Clone)]
pub struct SpApiClient {
    client: Client,
    base_url: Url,
    token_url: Url,
    seller_id: String,
    marketplace_id: String,
    lwa_client_id: String,
    lwa_client_secret: String,
    refresh_token: String,
    token: Arc<Mutex<Option<CachedToken>>>,
}

impl SpApiClient {
    /// # Errors
    ///
    /// Returns [`MarketplaceError::InvalidBaseUrl`] or [`MarketplaceError::Http`].
    pub fn from_config(config: &AmazonConfig, http: &HttpConfig) -> Result<Self, MarketplaceError> {
        Ok(Self {
            client: build_client(http.timeout_secs, &http.user_agent)?,
            base_url: parse_base_url(&config.base_url)?,
            token_url: Url::parse(DEFAULT_TOKEN_URL).map_err(|e| {
                MarketplaceError::InvalidBaseUrl {
                    base_url: DEFAULT_TOKEN_URL.to_owned(),
                    reason: e.to_string(),
                }
            })?,
            seller_id: config.seller_id.clone(),
            marketplace_id: config.marketplace_id.clone(),
            lwa_client_id: config.lwa_client_id.clone(),
            lwa_client_secret: config.lwa_client_secret.clone(),
            refresh_token: config.refresh_token.clone(),
            token: Arc::new(Mutex::new(None)),
        })
    }

    /// Points LWA token exchange at another endpoint (used by tests).
    ///
    /// # Errors
    ///
    /// Returns [`MarketplaceError::InvalidBaseUrl`] if `token_url` does not parse.
    pub fn with_token_url(mut self, token_url: &str) -> Result<Self, MarketplaceError> {
        self.token_url = Url::parse(token_url).map_err(|e| MarketplaceError::InvalidBaseUrl {
            base_url: token_url.to_owned(),
            reason: e.to_string(),
        })?;
        Ok(self)
    }

    #[must_use]
    pub fn seller_id(&self) -> &str {
        &self.seller_id
    }

    /// Returns a cached LWA access token, exchanging the refresh token when
    /// the cached one is missing or about to expire.
    async fn access_token(&self) -> Result<String, MarketplaceError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Instant::now() + TOKEN_REFRESH_MARGIN {
                return Ok(token.access_token.clone());
            }
        }

        let response = self
            .client
            .post(self.token_url.clone())
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", self.refresh_token.as_str()),
                ("client_id", self.lwa_client_id.as_str()),
                ("client_secret", self.lwa_client_secret.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            let excerpt: String = body.chars().take(200).collect();
            return Err(MarketplaceError::Auth {
                service: LWA_SERVICE,
                message: format!("token exchange returned HTTP {status}: {excerpt}"),
            });
        }

        let token: TokenResponse = read_json(response, "LWA token").await?;
        tracing::debug!(expires_in = token.expires_in, "refreshed SP-API access token");
        let access_token = token.access_token.clone();
        *cached = Some(CachedToken {
            access_token: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        });
        Ok(access_token)
    }

    /// # Errors
    ///
    /// Returns any auth, transport, or decode error.
    pub async fn create_feed_document(&self) -> Result<FeedDocument, MarketplaceError> {
        let token = self.access_token().await?;
        let url = join(&self.base_url, "feeds/2021-06-30/documents")?;
        let response = self
            .client
            .post(url)
            .header("x-amz-access-token", token)
            .json(&serde_json::json!({ "contentType": FEED_CONTENT_TYPE }))
            .send()
            .await?;
        let response = check_status(SERVICE, response).await?;
        read_json(response, "createFeedDocument").await
    }

    /// Uploads feed content to the pre-signed URL from [`Self::create_feed_document`].
    ///
    /// # Errors
    ///
    /// Returns any transport error or non-2xx status.
    pub async fn upload_feed_document(
        &self,
        document: &FeedDocument,
        body: String,
    ) -> Result<(), MarketplaceError> {
        let response = self
            .client
            .put(&document.url)
            .header(reqwest::header::CONTENT_TYPE, FEED_CONTENT_TYPE)
            .body(body)
            .send()
            .await?;
        check_status(SERVICE, response).await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns any auth, transport, or decode error.
    pub async fn create_feed(&self, feed_document_id: &str) -> Result<String, MarketplaceError> {
        let token = self.access_token().await?;
        let url = join(&self.base_url, "feeds/2021-06-30/feeds")?;
        let response = self
            .client
            .post(url)
            .header("x-amz-access-token", token)
            .json(&serde_json::json!({
                "feedType": FEED_TYPE,
                "marketplaceIds": [self.marketplace_id],
                "inputFeedDocumentId": feed_document_id,
            }))
            .send()
            .await?;
        let response = check_status(SERVICE, response).await?;
        let created: CreateFeedResponse = read_json(response, "createFeed").await?;
        Ok(created.feed_id)
    }

    /// # Errors
    ///
    /// Returns any auth, transport, or decode error.
    pub async fn get_feed(&self, feed_id: &str) -> Result<Feed, MarketplaceError> {
        let token = self.access_token().await?;
        let mut url = join(&self.base_url, "feeds/2021-06-30/feeds")?;
        push_segments(&mut url, &[feed_id])?;
        let response = self
            .client
            .get(url)
            .header("x-amz-access-token", token)
            .send()
            .await?;
        let response = check_status(SERVICE, response).await?;
        read_json(response, "getFeed").await
    }

    /// Reads the live B2C offer price for one of this seller's SKUs.
    ///
    /// # Errors
    ///
    /// Returns any auth, transport, or decode error. A missing listing is
    /// [`MarketplaceError::NotFound`].
    pub async fn get_listing_price(&self, sku: &str) -> Result<Option<Decimal>, MarketplaceError> {
        let token = self.access_token().await?;
        let mut url = join(&self.base_url, "listings/2021-08-01/items")?;
        push_segments(&mut url, &[&self.seller_id, sku])?;
        url.query_pairs_mut()
            .append_pair("marketplaceIds", &self.marketplace_id)
            .append_pair("includedData", "offers");

        let response = self
            .client
            .get(url)
            .header("x-amz-access-token", token)
            .send()
            .await?;
        let response = check_status(SERVICE, response).await?;
        let item: ListingItem = read_json(response, "getListingsItem").await?;

        Ok(item
            .offers
            .into_iter()
            .filter(|o| o.offer_type.as_deref().is_none_or(|t| t == "B2C"))
            .find_map(|o| o.price.map(|p| p.amount)))
    }
}

/// Appends percent-encoded path segments.
fn push_segments(url: &mut Url, segments: &[&str]) -> Result<(), MarketplaceError> {
    let base = url.to_string();
    url.path_segments_mut()
        .map_err(|()| MarketplaceError::InvalidBaseUrl {
            base_url: base,
            reason: "URL cannot carry path segments".to_owned(),
        })?
        .pop_if_empty()
        .extend(segments);
    Ok(())
}

#[async_trait]
impl ListingsGateway for SpApiClient {
    async fn submit_feed(
        &self,
        kind: FeedKind,
        updates: &[ListingUpdate],
    ) -> Result<String, MarketplaceError> {
        let body = build_listings_feed(&self.seller_id, &self.marketplace_id, kind, updates)?;
        let document = self.create_feed_document().await?;
        self.upload_feed_document(&document, body.to_string()).await?;
        let feed_id = self.create_feed(&document.feed_document_id).await?;
        tracing::info!(
            feed_id = %feed_id,
            kind = kind.as_str(),
            messages = updates.len(),
            "submitted Amazon listings feed"
        );
        Ok(feed_id)
    }

    async fn feed_status(&self, feed_id: &str) -> Result<FeedProcessingStatus, MarketplaceError> {
        Ok(self.get_feed(feed_id).await?.processing_status)
    }

    async fn listing_price(&self, sku: &str) -> Result<Option<Decimal>, MarketplaceError> {
        self.get_listing_price(sku).await
    }
}
