//! Cross-site comparison command implementation.

use crate::bank::{BankClient, ExchangeBoard};
use crate::config::Config;
use crate::format::Formatter;
use crate::meli::{CurrencyRates, MeliClient, SiteDirectory, SiteQuerier};
use crate::pipeline::Orchestrator;
use crate::report::ComparisonReport;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

/// Rendered command output, split by destination stream.
#[derive(Debug)]
pub struct CompareOutput {
    /// Successful sites (and the bank quote), for stdout
    pub report: String,
    /// One line per failed site, for stderr
    pub failures: Vec<String>,
    /// Set when a requested bank quote could not be fetched
    pub bank_error: Option<anyhow::Error>,
}

/// Searches every site for the priciest listing of a term.
pub struct CompareCommand {
    config: Config,
}

impl CompareCommand {
    /// Creates a new compare command.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Runs the comparison against the live API and returns formatted output.
    pub async fn execute(&self, term: &str) -> Result<CompareOutput> {
        let client =
            Arc::new(MeliClient::new(&self.config).context("Failed to create HTTP client")?);

        let bank = if self.config.bank_quote {
            Some(BankClient::new(&self.config).context("Failed to create bank HTTP client")?)
        } else {
            None
        };

        self.execute_with(client, bank.as_ref().map(|b| b as &dyn ExchangeBoard), term).await
    }

    /// Runs the comparison with provided clients (for testing).
    pub async fn execute_with<C>(
        &self,
        client: Arc<C>,
        bank: Option<&dyn ExchangeBoard>,
        term: &str,
    ) -> Result<CompareOutput>
    where
        C: SiteDirectory + SiteQuerier + CurrencyRates + 'static,
    {
        let term = self.search_term(term);
        info!("Comparing {:?} in {}", term, self.config.reference_currency);

        let orchestrator =
            Orchestrator::with_client(client, self.config.reference_currency.as_str());

        let (collection, quote) = match bank {
            Some(bank) => {
                let (collection, quote) = tokio::join!(
                    orchestrator.run(&term),
                    bank.quote(&self.config.bank_currency_label)
                );
                (collection, Some(quote))
            }
            None => (orchestrator.run(&term).await, None),
        };

        let collection = collection.context("Failed to discover sites")?;
        let mut report =
            ComparisonReport::new(term, self.config.reference_currency.as_str(), collection);

        let mut bank_error = None;
        if let Some(quote) = quote {
            match quote.context("Failed to fetch bank quote") {
                Ok(quote) => report = report.with_bank_quote(quote),
                Err(e) => bank_error = Some(e),
            }
        }

        if report.results.is_empty() && !report.failures.is_empty() {
            warn!("Every site failed for {:?}", report.term);
        }

        let formatter = Formatter::new(self.config.format);
        Ok(CompareOutput {
            report: formatter.format_report(&report),
            failures: formatter.format_failures(&report),
            bank_error,
        })
    }

    fn search_term(&self, term: &str) -> String {
        let term = term.trim();
        if term.is_empty() {
            self.config.default_search.clone()
        } else {
            term.to_string()
        }
    }
}
