//! HTTP client for the Keepa REST API.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use tokio::sync::Mutex;

use brickdesk_core::{HttpConfig, KeepaConfig};

use crate::error::KeepaError;
use crate::types::{describe_api_error, KeepaProduct, ProductResponse, RateLimitBody};

const DEFAULT_BASE_URL: &str = "https://api.keepa.com";

/// Keepa's per-request identifier limit for `/product`.
pub const MAX_IDENTIFIERS: usize = 100;

const DEFAULT_REFILL_MS: u64 = 60_000;

/// How the client reacts to Keepa's token bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    /// Total attempts per request when Keepa answers 429.
    pub max_attempts: u32,
    /// Lower bound on the wait after a 429.
    pub min_wait: Duration,
    /// Added on top of every post-429 wait.
    pub padding: Duration,
    /// Below this many tokens the next request waits for a refill first.
    pub min_tokens: i64,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            min_wait: Duration::from_secs(10),
            padding: Duration::from_secs(2),
            min_tokens: 5,
        }
    }
}

impl RateLimitPolicy {
    /// `max(refillIn, min_wait) + padding`, with a missing `refillIn` read as one minute.
    #[must_use]
    pub fn wait_after_rate_limit(&self, refill_in_ms: Option<u64>) -> Duration {
        let refill = Duration::from_millis(refill_in_ms.unwrap_or(DEFAULT_REFILL_MS));
        refill.max(self.min_wait) + self.padding
    }
}

#[derive(Debug, Default)]
struct TokenState {
    tokens_left: Option<i64>,
    refill_in_ms: Option<u64>,
}

/// Product lookups used by ASIN discovery. Implemented by [`KeepaClient`].
#[async_trait]
pub trait ProductSource: Send + Sync {
    async fn products_by_code(&self, codes: &[String]) -> Result<Vec<KeepaProduct>, KeepaError>;
    async fn search(&self, term: &str) -> Result<Vec<KeepaProduct>, KeepaError>;
}

#[derive(Debug, Clone)]
pub struct KeepaClient {
    client: Client,
    base_url: Url,
    api_key: String,
    domain: u8,
    policy: RateLimitPolicy,
    tokens: Arc<Mutex<TokenState>>,
}

impl KeepaClient {
    /// # Errors
    ///
    /// Returns [`KeepaError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(
        api_key: &str,
        domain: u8,
        timeout_secs: u64,
        user_agent: &str,
    ) -> Result<Self, KeepaError> {
        Self::with_base_url(api_key, domain, timeout_secs, user_agent, DEFAULT_BASE_URL)
    }

    /// Creates a client against a custom base URL (used by tests).
    ///
    /// # Errors
    ///
    /// Returns [`KeepaError::InvalidBaseUrl`] or [`KeepaError::Http`].
    pub fn with_base_url(
        api_key: &str,
        domain: u8,
        timeout_secs: u64,
        user_agent: &str,
        base_url: &str,
    ) -> Result<Self, KeepaError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| KeepaError::InvalidBaseUrl {
            base_url: base_url.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            base_url,
            api_key: api_key.to_owned(),
            domain,
            policy: RateLimitPolicy::default(),
            tokens: Arc::new(Mutex::new(TokenState::default())),
        })
    }

    /// # Errors
    ///
    /// See [`KeepaClient::new`].
    pub fn from_config(config: &KeepaConfig, http: &HttpConfig) -> Result<Self, KeepaError> {
        Self::new(&config.api_key, config.domain, http.timeout_secs, &http.user_agent)
    }

    #[must_use]
    pub fn with_rate_limit_policy(mut self, policy: RateLimitPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Last `tokensLeft` Keepa reported, if any request has completed.
    pub async fn tokens_left(&self) -> Option<i64> {
        self.tokens.lock().await.tokens_left
    }

    /// Fetches products with 90-day stats, buy box, and full price history.
    ///
    /// # Errors
    ///
    /// Returns [`KeepaError::BatchTooLarge`] for more than 100 ASINs, or any
    /// request error.
    pub async fn products_by_asin(&self, asins: &[String]) -> Result<Vec<KeepaProduct>, KeepaError> {
        self.product_request("asin", asins).await
    }

    /// Looks products up by EAN/UPC codes.
    ///
    /// # Errors
    ///
    /// Returns [`KeepaError::BatchTooLarge`] for more than 100 codes, or any
    /// request error.
    pub async fn products_by_code(&self, codes: &[String]) -> Result<Vec<KeepaProduct>, KeepaError> {
        self.product_request("code", codes).await
    }

    /// Keyword product search.
    ///
    /// # Errors
    ///
    /// Returns any request error.
    pub async fn search(&self, term: &str) -> Result<Vec<KeepaProduct>, KeepaError> {
        let params = [("type", "product".to_owned()), ("term", term.to_owned())];
        let response = self.get("search", &params, "search").await?;
        Ok(response.products)
    }

    async fn product_request(
        &self,
        id_param: &'static str,
        ids: &[String],
    ) -> Result<Vec<KeepaProduct>, KeepaError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        if ids.len() > MAX_IDENTIFIERS {
            return Err(KeepaError::BatchTooLarge {
                len: ids.len(),
                max: MAX_IDENTIFIERS,
            });
        }
        let params = [
            (id_param, ids.join(",")),
            ("stats", "90".to_owned()),
            ("buybox", "1".to_owned()),
            ("history", "1".to_owned()),
        ];
        let response = self.get("product", &params, "product").await?;
        Ok(response.products)
    }

    async fn wait_for_tokens(&self) {
        let wait = {
            let state = self.tokens.lock().await;
            match state.tokens_left {
                Some(left) if left < self.policy.min_tokens => Some((
                    left,
                    Duration::from_millis(state.refill_in_ms.unwrap_or(DEFAULT_REFILL_MS)),
                )),
                _ => None,
            }
        };
        if let Some((left, wait)) = wait {
            tracing::info!(
                tokens_left = left,
                wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
                "Keepa tokens low, waiting for refill"
            );
            tokio::time::sleep(wait).await;
        }
    }

    async fn record_tokens(&self, tokens_left: Option<i64>, refill_in_ms: Option<u64>) {
        let mut state = self.tokens.lock().await;
        if tokens_left.is_some() {
            state.tokens_left = tokens_left;
        }
        if refill_in_ms.is_some() {
            state.refill_in_ms = refill_in_ms;
        }
    }

    async fn get(
        &self,
        path: &str,
        params: &[(&str, String)],
        context: &str,
    ) -> Result<ProductResponse, KeepaError> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| KeepaError::InvalidBaseUrl {
                base_url: self.base_url.to_string(),
                reason: e.to_string(),
            })?;
        let domain = self.domain.to_string();

        for attempt in 1..=self.policy.max_attempts {
            self.wait_for_tokens().await;

            let response = self
                .client
                .get(url.clone())
                .query(&[("key", self.api_key.as_str()), ("domain", domain.as_str())])
                .query(params)
                .send()
                .await?;
            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                let body = response.text().await.unwrap_or_default();
                let limit: RateLimitBody = serde_json::from_str(&body).unwrap_or_default();
                let wait = self.policy.wait_after_rate_limit(limit.refill_in);
                tracing::warn!(
                    attempt,
                    max_attempts = self.policy.max_attempts,
                    tokens_left = limit.tokens_left,
                    wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
                    "Keepa rate limited"
                );
                if attempt < self.policy.max_attempts {
                    tokio::time::sleep(wait).await;
                }
                continue;
            }

            if !status.is_success() {
                return Err(KeepaError::UnexpectedStatus {
                    status: status.as_u16(),
                    url: url.to_string(),
                });
            }

            let body = response.text().await?;
            let parsed: ProductResponse =
                serde_json::from_str(&body).map_err(|e| KeepaError::Deserialize {
                    context: context.to_owned(),
                    source: e,
                })?;
            self.record_tokens(parsed.tokens_left, parsed.refill_in).await;

            if let Some(error) = parsed.error.as_ref() {
                return Err(KeepaError::Api(describe_api_error(error)));
            }

            tracing::debug!(
                context,
                products = parsed.products.len(),
                tokens_left = parsed.tokens_left,
                "Keepa request complete"
            );
            return Ok(parsed);
        }

        Err(KeepaError::RateLimited {
            attempts: self.policy.max_attempts,
        })
    }
}

#[async_trait]
impl ProductSource for KeepaClient {
    async fn products_by_code(&self, codes: &[String]) -> Result<Vec<KeepaProduct>, KeepaError> {
        KeepaClient::products_by_code(self, codes).await
    }

    async fn search(&self, term: &str) -> Result<Vec<KeepaProduct>, KeepaError> {
        KeepaClient::search(self, term).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_wait_has_floor_and_padding() {
        let policy = RateLimitPolicy::default();
        assert_eq!(policy.wait_after_rate_limit(Some(3_000)), Duration::from_secs(12));
        assert_eq!(policy.wait_after_rate_limit(Some(45_000)), Duration::from_secs(47));
        assert_eq!(policy.wait_after_rate_limit(None), Duration::from_secs(62));
    }

    #[tokio::test]
    async fn oversized_batches_are_rejected_without_a_request() {
        let client = KeepaClient::with_base_url("k", 2, 5, "ua", "http://127.0.0.1:9")
            .expect("client construction should not fail");
        let asins: Vec<String> = (0..101).map(|i| format!("B{i:09}")).collect();
        let err = client.products_by_asin(&asins).await.unwrap_err();
        assert!(matches!(err, KeepaError::BatchTooLarge { len: 101, max: 100 }));
    }

    #[tokio::test]
    async fn empty_batches_short_circuit() {
        let client = KeepaClient::with_base_url("k", 2, 5, "ua", "http://127.0.0.1:9")
            .expect("client construction should not fail");
        assert!(client.products_by_code(&[]).await.unwrap().is_empty());
    }
}
