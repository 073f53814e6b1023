//! Brickset API v3: set catalogue with regional retail prices.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::{Client, Url};
use rust_decimal::Decimal;
use serde::Deserialize;

use brickdesk_core::{CatalogSet, HttpConfig, MIN_RRP_GBP};

use crate::error::MarketplaceError;
use crate::http::{build_client, check_status, join, parse_base_url, read_json};

const DEFAULT_BASE_URL: &str = "https://brickset.com/api/v3.asmx";
const SERVICE: &str = "Brickset";

/// Brickset's maximum `pageSize` for `getSets`.
pub const PAGE_SIZE: u32 = 500;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BricksetPage {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub matches: u64,
    #[serde(default)]
    pub sets: Vec<BricksetSet>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BricksetSet {
    pub number: String,
    #[serde(default = "default_variant")]
    pub number_variant: i32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub theme: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub barcode: Option<Barcode>,
    #[serde(default, rename = "LEGOCom")]
    pub lego_com: Option<LegoCom>,
}

fn default_variant() -> i32 {
    1
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Barcode {
    #[serde(default, rename = "EAN")]
    pub ean: Option<String>,
    #[serde(default, rename = "UPC")]
    pub upc: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LegoCom {
    #[serde(default, rename = "UK")]
    pub uk: Option<RegionalDetails>,
    #[serde(default, rename = "US")]
    pub us: Option<RegionalDetails>,
    #[serde(default, rename = "DE")]
    pub de: Option<RegionalDetails>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionalDetails {
    #[serde(default)]
    pub retail_price: Option<Decimal>,
}

impl BricksetSet {
    /// `"75192"` + variant 1 → `"75192-1"`.
    #[must_use]
    pub fn set_number(&self) -> String {
        format!("{}-{}", self.number, self.number_variant)
    }

    fn retail(region: Option<&RegionalDetails>) -> Option<Decimal> {
        region.and_then(|r| r.retail_price).filter(|p| *p > Decimal::ZERO)
    }

    #[must_use]
    pub fn uk_retail_price(&self) -> Option<Decimal> {
        Self::retail(self.lego_com.as_ref().and_then(|l| l.uk.as_ref()))
    }

    #[must_use]
    pub fn to_catalog_set(&self) -> CatalogSet {
        let lego_com = self.lego_com.as_ref();
        let barcode = self.barcode.as_ref();
        CatalogSet {
            set_number: self.set_number(),
            set_name: self.name.clone(),
            theme: self.theme.clone(),
            year: self.year,
            ean: barcode.and_then(|b| b.ean.clone()).filter(|c| !c.is_empty()),
            upc: barcode.and_then(|b| b.upc.clone()).filter(|c| !c.is_empty()),
            uk_retail_price: self.uk_retail_price(),
            us_retail_price: Self::retail(lego_com.and_then(|l| l.us.as_ref())),
            de_retail_price: Self::retail(lego_com.and_then(|l| l.de.as_ref())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BricksetClient {
    client: Client,
    base_url: Url,
    api_key: String,
    page_delay: Duration,
}

impl BricksetClient {
    /// # Errors
    ///
    /// Returns [`MarketplaceError::Http`] if the client cannot be built.
    pub fn new(api_key: &str, http: &HttpConfig) -> Result<Self, MarketplaceError> {
        Self::with_base_url(api_key, http, DEFAULT_BASE_URL)
    }

    /// # Errors
    ///
    /// Returns [`MarketplaceError::InvalidBaseUrl`] or [`MarketplaceError::Http`].
    pub fn with_base_url(
        api_key: &str,
        http: &HttpConfig,
        base_url: &str,
    ) -> Result<Self, MarketplaceError> {
        Ok(Self {
            client: build_client(http.timeout_secs, &http.user_agent)?,
            base_url: parse_base_url(base_url)?,
            api_key: api_key.to_owned(),
            page_delay: Duration::from_secs(1),
        })
    }

    /// Pause between consecutive pages of one year.
    #[must_use]
    pub fn with_page_delay(mut self, page_delay: Duration) -> Self {
        self.page_delay = page_delay;
        self
    }

    /// One page of `getSets` for a release year, with extended data.
    ///
    /// # Errors
    ///
    /// Returns [`MarketplaceError::Api`] when Brickset answers with a
    /// non-success `status`, or any transport/decode error.
    pub async fn get_sets(&self, year: i32, page: u32) -> Result<BricksetPage, MarketplaceError> {
        let url = join(&self.base_url, "getSets")?;
        let params = serde_json::json!({ "year": year.to_string() }).to_string();
        let page_number = page.max(1).to_string();
        let page_size = PAGE_SIZE.to_string();

        let response = self
            .client
            .post(url)
            .form(&[
                ("apiKey", self.api_key.as_str()),
                ("userHash", ""),
                ("params", params.as_str()),
                ("pageSize", page_size.as_str()),
                ("pageNumber", page_number.as_str()),
                ("extendedData", "1"),
            ])
            .send()
            .await?;
        let response = check_status(SERVICE, response).await?;
        let body: BricksetPage = read_json(response, "Brickset getSets").await?;

        if body.status != "success" {
            return Err(MarketplaceError::Api {
                service: SERVICE,
                status: 200,
                message: body.message.unwrap_or_else(|| "unknown error".to_owned()),
            });
        }
        Ok(body)
    }

    /// Every set released in `year`, following pages until `matches` is covered.
    /// A page failing after the first ends the walk early, keeping the sets
    /// already fetched.
    ///
    /// # Errors
    ///
    /// Returns the error if the first page fails.
    pub async fn fetch_year(&self, year: i32) -> Result<Vec<BricksetSet>, MarketplaceError> {
        let mut sets = Vec::new();
        let mut page = 1u32;
        loop {
            let body = match self.get_sets(year, page).await {
                Ok(body) => body,
                Err(e) if page > 1 => {
                    tracing::warn!(
                        year,
                        page,
                        kept = sets.len(),
                        error = %e,
                        "Brickset page failed, keeping earlier pages"
                    );
                    break;
                }
                Err(e) => return Err(e),
            };
            if body.sets.is_empty() {
                break;
            }
            sets.extend(body.sets);
            if u64::from(page) * u64::from(PAGE_SIZE) >= body.matches {
                break;
            }
            page += 1;
            tokio::time::sleep(self.page_delay).await;
        }
        tracing::debug!(year, sets = sets.len(), "fetched Brickset year");
        Ok(sets)
    }

    /// UK retail prices (at least £5) keyed by set number, for every set
    /// released in `years`. A year that fails is logged and skipped.
    pub async fn fetch_uk_prices(&self, years: &[i32]) -> HashMap<String, Decimal> {
        let mut prices = HashMap::new();
        for &year in years {
            match self.fetch_year(year).await {
                Ok(sets) => {
                    prices.extend(sets.iter().filter_map(|s| {
                        s.uk_retail_price()
                            .filter(|p| *p >= MIN_RRP_GBP)
                            .map(|p| (s.set_number(), p))
                    }));
                }
                Err(e) => tracing::error!(year, error = %e, "Brickset year fetch failed"),
            }
        }
        tracing::info!(sets = prices.len(), "Brickset UK prices collected");
        prices
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_to_catalog_set() {
        let json = serde_json::json!({
            "setID": 31754,
            "number": "75192",
            "numberVariant": 1,
            "name": "Millennium Falcon",
            "theme": "Star Wars",
            "year": 2017,
            "barcode": { "EAN": "5702016125979", "UPC": "" },
            "LEGOCom": {
                "UK": { "retailPrice": 649.99 },
                "US": { "retailPrice": 849.99 },
                "DE": {}
            }
        });
        let set: BricksetSet = serde_json::from_value(json).unwrap();
        let catalog = set.to_catalog_set();

        assert_eq!(catalog.set_number, "75192-1");
        assert_eq!(catalog.ean.as_deref(), Some("5702016125979"));
        assert!(catalog.upc.is_none());
        assert_eq!(catalog.uk_retail_price, Some(Decimal::new(64999, 2)));
        assert_eq!(catalog.us_retail_price, Some(Decimal::new(84999, 2)));
        assert!(catalog.de_retail_price.is_none());
    }

    #[test]
    fn zero_prices_are_treated_as_missing() {
        let json = serde_json::json!({
            "number": "40000",
            "LEGOCom": { "UK": { "retailPrice": 0 } }
        });
        let set: BricksetSet = serde_json::from_value(json).unwrap();
        assert_eq!(set.set_number(), "40000-1");
        assert!(set.uk_retail_price().is_none());
    }
}
