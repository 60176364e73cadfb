//! HTTP client for the public MercadoLibre API.

use crate::config::Config;
use crate::error::{FetchError, Result};
use crate::meli::models::{ConversionRatio, Listing, SearchPage, Site};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info};
use wreq::Client;

/// Sort key that puts the most expensive listing first.
const SORT_PRICE_DESC: &str = "price_desc";

/// Lists the regional sites.
#[async_trait]
pub trait SiteDirectory: Send + Sync {
    async fn sites(&self) -> Result<Vec<Site>>;
}

/// Finds the priciest listing for a term on one site.
#[async_trait]
pub trait SiteQuerier: Send + Sync {
    async fn search_top(&self, term: &str, site: &Site) -> Result<Listing>;
}

/// Looks up exchange ratios between currencies.
#[async_trait]
pub trait CurrencyRates: Send + Sync {
    /// Units of `target` per unit of `source`.
    async fn currency_ratio(&self, source: &str, target: &str) -> Result<Decimal>;
}

/// MercadoLibre API client.
pub struct MeliClient {
    client: Client,
    base_url: String,
}

impl MeliClient {
    /// Creates a client for the API at `config.api_base_url`.
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_base_url(config.api_base_url.clone(), Duration::from_secs(config.timeout_secs))
    }

    /// Creates a client against a custom base URL (for testing).
    pub fn with_base_url(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .gzip(true)
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|source| FetchError::Transport { context: "building http client", source })?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { client, base_url })
    }

    /// GETs `url` and decodes the JSON body into `T`.
    async fn get_json<T: DeserializeOwned>(&self, url: &str, context: &'static str) -> Result<T> {
        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|source| FetchError::Transport { context, source })?;

        let status = response.status();
        debug!("Response status: {}", status);

        if !status.is_success() {
            return Err(FetchError::Status { context, status: status.as_u16() });
        }

        let body =
            response.text().await.map_err(|source| FetchError::Transport { context, source })?;

        serde_json::from_str(&body).map_err(|e| FetchError::parse(context, e))
    }
}

#[async_trait]
impl SiteDirectory for MeliClient {
    async fn sites(&self) -> Result<Vec<Site>> {
        let url = format!("{}/sites", self.base_url);

        info!("Fetching MercadoLibre sites");
        self.get_json(&url, "fetching sites").await
    }
}

#[async_trait]
impl SiteQuerier for MeliClient {
    async fn search_top(&self, term: &str, site: &Site) -> Result<Listing> {
        let url = format!(
            "{}/sites/{}/search?q={}&sort={}",
            self.base_url,
            urlencoding::encode(&site.id),
            urlencoding::encode(term),
            SORT_PRICE_DESC
        );

        info!("Searching {} ({}) for: {}", site.name, site.id, term);
        let page: SearchPage = self.get_json(&url, "searching site").await?;
        page.into_top_listing(term)
    }
}

#[async_trait]
impl CurrencyRates for MeliClient {
    async fn currency_ratio(&self, source: &str, target: &str) -> Result<Decimal> {
        let url = format!(
            "{}/currency_conversions/search?from={}&to={}",
            self.base_url,
            urlencoding::encode(source),
            urlencoding::encode(target)
        );

        debug!("Fetching {} -> {} ratio", source, target);
        let ratio: ConversionRatio = self.get_json(&url, "fetching currency ratio").await?;
        Ok(ratio.ratio)
    }
}
