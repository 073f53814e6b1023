//! HTTP client for the Bricqer REST API.

use std::time::Duration;

use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;

use brickdesk_core::{BricqerConfig, HttpConfig};

use crate::error::BricqerError;
use crate::rate_limit::RequestSpacer;
use crate::retry::{retry_with_backoff, RetryPolicy};
use crate::types::{BricqerInventoryItem, BricqerOrder, Page};

const ORDERS_PATH: &str = "orders/order/";
const INVENTORY_PATH: &str = "inventory/item/";

/// Client for one Bricqer tenant.
///
/// Cheap to clone; clones share the connection pool and the request spacer.
#[derive(Debug, Clone)]
pub struct BricqerClient {
    client: Client,
    base_url: Url,
    api_key: String,
    retry: RetryPolicy,
    spacer: RequestSpacer,
}

impl BricqerClient {
    /// # Errors
    ///
    /// Returns [`BricqerError::InvalidBaseUrl`] if `base_url` does not parse,
    /// or [`BricqerError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(
        base_url: &str,
        api_key: &str,
        timeout_secs: u64,
        user_agent: &str,
        retry: RetryPolicy,
        min_request_interval: Duration,
    ) -> Result<Self, BricqerError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        // A trailing slash makes Url::join append to the path instead of
        // replacing its last segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let parsed = Url::parse(&normalised).map_err(|e| BricqerError::InvalidBaseUrl {
            base_url: base_url.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            base_url: parsed,
            api_key: api_key.to_owned(),
            retry,
            spacer: RequestSpacer::new(min_request_interval),
        })
    }

    /// Builds a client from application configuration.
    ///
    /// # Errors
    ///
    /// See [`BricqerClient::new`].
    pub fn from_config(config: &BricqerConfig, http: &HttpConfig) -> Result<Self, BricqerError> {
        Self::new(
            &config.base_url,
            &config.api_key,
            http.timeout_secs,
            &http.user_agent,
            RetryPolicy::new(http.max_retries, http.backoff_base_ms),
            Duration::from_millis(config.min_request_interval_ms),
        )
    }

    /// Fetches one page of orders (1-based).
    ///
    /// # Errors
    ///
    /// Returns any [`BricqerError`] left after retries.
    pub async fn list_orders(&self, page: u32) -> Result<Page<BricqerOrder>, BricqerError> {
        let url = self.page_url(ORDERS_PATH, page)?;
        self.get_json(url, "list_orders").await
    }

    /// Follows order pagination until `next` is null.
    ///
    /// # Errors
    ///
    /// Returns [`BricqerError::PaginationLimit`] if more than `max_pages`
    /// pages would be needed, or any request error.
    pub async fn fetch_all_orders(&self, max_pages: usize) -> Result<Vec<BricqerOrder>, BricqerError> {
        let first = self.page_url(ORDERS_PATH, 1)?;
        self.fetch_all(first, "orders", max_pages).await
    }

    /// # Errors
    ///
    /// Returns [`BricqerError::NotFound`] for unknown ids, or any request error.
    pub async fn get_order(&self, id: i64) -> Result<BricqerOrder, BricqerError> {
        let url = self.join(&format!("{ORDERS_PATH}{id}/"))?;
        self.get_json(url, "get_order").await
    }

    /// Fetches one page of stock items (1-based).
    ///
    /// # Errors
    ///
    /// Returns any [`BricqerError`] left after retries.
    pub async fn list_inventory(
        &self,
        page: u32,
    ) -> Result<Page<BricqerInventoryItem>, BricqerError> {
        let url = self.page_url(INVENTORY_PATH, page)?;
        self.get_json(url, "list_inventory").await
    }

    /// Follows inventory pagination until `next` is null.
    ///
    /// # Errors
    ///
    /// Returns [`BricqerError::PaginationLimit`] if more than `max_pages`
    /// pages would be needed, or any request error.
    pub async fn fetch_all_inventory(
        &self,
        max_pages: usize,
    ) -> Result<Vec<BricqerInventoryItem>, BricqerError> {
        let first = self.page_url(INVENTORY_PATH, 1)?;
        self.fetch_all(first, "inventory", max_pages).await
    }

    async fn fetch_all<T: DeserializeOwned>(
        &self,
        first: Url,
        resource: &str,
        max_pages: usize,
    ) -> Result<Vec<T>, BricqerError> {
        let mut items = Vec::new();
        let mut next = Some(first);
        let mut pages = 0usize;

        while let Some(url) = next.take() {
            if pages >= max_pages {
                return Err(BricqerError::PaginationLimit {
                    resource: resource.to_owned(),
                    max_pages,
                });
            }
            let page: Page<T> = self.get_json(url, resource).await?;
            pages += 1;
            items.extend(page.results);
            next = page.next.as_deref().map(|n| self.resolve(n)).transpose()?;
        }

        tracing::debug!(resource, pages, items = items.len(), "Bricqer pagination complete");
        Ok(items)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url, context: &str) -> Result<T, BricqerError> {
        retry_with_backoff(self.retry, || {
            let url = url.clone();
            async move {
                self.spacer.wait().await;

                let response = self
                    .client
                    .get(url.clone())
                    .header(reqwest::header::AUTHORIZATION, format!("Api-Key {}", self.api_key))
                    .header(reqwest::header::ACCEPT, "application/json")
                    .send()
                    .await?;
                let status = response.status();

                if status == StatusCode::TOO_MANY_REQUESTS {
                    let retry_after_secs = response
                        .headers()
                        .get(reqwest::header::RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| s.trim().parse::<u64>().ok());
                    return Err(BricqerError::RateLimited { retry_after_secs });
                }
                if status.is_server_error() {
                    return Err(BricqerError::ServerError {
                        status: status.as_u16(),
                        url: url.to_string(),
                    });
                }
                if status == StatusCode::NOT_FOUND {
                    return Err(BricqerError::NotFound {
                        url: url.to_string(),
                    });
                }
                if !status.is_success() {
                    return Err(BricqerError::UnexpectedStatus {
                        status: status.as_u16(),
                        url: url.to_string(),
                    });
                }

                let body = response.text().await?;
                serde_json::from_str(&body).map_err(|e| BricqerError::Deserialize {
                    context: context.to_owned(),
                    source: e,
                })
            }
        })
        .await
    }

    fn join(&self, path: &str) -> Result<Url, BricqerError> {
        self.base_url
            .join(path)
            .map_err(|e| BricqerError::InvalidBaseUrl {
                base_url: self.base_url.to_string(),
                reason: e.to_string(),
            })
    }

    fn page_url(&self, path: &str, page: u32) -> Result<Url, BricqerError> {
        let mut url = self.join(path)?;
        url.query_pairs_mut()
            .append_pair("page", &page.max(1).to_string());
        Ok(url)
    }

    /// `next` links are normally absolute; relative ones resolve against the base.
    fn resolve(&self, next: &str) -> Result<Url, BricqerError> {
        Url::parse(next).or_else(|_| self.join(next.trim_start_matches('/')))
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
