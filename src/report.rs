//! The consolidated comparison handed to the formatter.

use crate::bank::BankQuote;
use crate::pipeline::{Collection, ResultSet, SiteFailure, SiteQuote};
use rust_decimal::Decimal;

/// Currency whose listings can be re-priced with the bank quote.
pub const BANK_LOCAL_CURRENCY: &str = "ARS";

/// Results of one search across every site.
#[derive(Debug)]
pub struct ComparisonReport {
    /// Search term used on every site
    pub term: String,
    /// Currency reference prices are expressed in
    pub reference_currency: String,
    pub results: ResultSet,
    pub failures: Vec<SiteFailure>,
    /// Bank quote, when requested and available
    pub bank_quote: Option<BankQuote>,
}

impl ComparisonReport {
    pub fn new(
        term: impl Into<String>,
        reference_currency: impl Into<String>,
        collection: Collection,
    ) -> Self {
        Self {
            term: term.into(),
            reference_currency: reference_currency.into(),
            results: collection.results,
            failures: collection.failures,
            bank_quote: None,
        }
    }

    pub fn with_bank_quote(mut self, quote: BankQuote) -> Self {
        self.bank_quote = Some(quote);
        self
    }

    /// Re-prices a peso-denominated quote at the bank's average rate.
    pub fn bank_price(&self, quote: &SiteQuote) -> Option<Decimal> {
        if !quote.site.default_currency_id.eq_ignore_ascii_case(BANK_LOCAL_CURRENCY) {
            return None;
        }
        self.bank_quote.as_ref().and_then(|bank| bank.convert(quote.native_price))
    }
}
