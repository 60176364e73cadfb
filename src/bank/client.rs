//! HTTP client for the bank's public "Personas" page.

use super::models::BankQuote;
use super::parser;
use crate::config::Config;
use crate::error::{FetchError, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info};
use wreq::Client;
use wreq_util::Emulation;

/// Source of buy/sell quotes - enables mocking for tests.
#[async_trait]
pub trait ExchangeBoard: Send + Sync {
    /// Fetches the quote of the currency whose board row reads `label`.
    async fn quote(&self, label: &str) -> Result<BankQuote>;
}

/// Scrapes the exchange board off the bank's web page.
pub struct BankClient {
    client: Client,
    url: String,
}

impl BankClient {
    /// Creates a client for `config.bank_url`.
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_url(config.bank_url.clone(), Duration::from_secs(config.timeout_secs))
    }

    /// Creates a client for a custom page URL (for testing).
    pub fn with_url(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|source| FetchError::Transport { context: "building http client", source })?;

        Ok(Self { client, url: url.into() })
    }

    async fn fetch_page(&self) -> Result<String> {
        const CONTEXT: &str = "fetching bank page";
        debug!("GET {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .emulation(Emulation::Chrome131)
            .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
            .header("Accept-Language", "es-AR,es;q=0.9,en;q=0.8")
            .send()
            .await
            .map_err(|source| FetchError::Transport { context: CONTEXT, source })?;

        let status = response.status();
        debug!("Response status: {}", status);

        if !status.is_success() {
            return Err(FetchError::Status { context: CONTEXT, status: status.as_u16() });
        }

        response.text().await.map_err(|source| FetchError::Transport { context: CONTEXT, source })
    }
}

#[async_trait]
impl ExchangeBoard for BankClient {
    async fn quote(&self, label: &str) -> Result<BankQuote> {
        info!("Fetching bank quote for {}", label);
        let html = self.fetch_page().await?;
        parser::parse_quote(&html, label)
    }
}
