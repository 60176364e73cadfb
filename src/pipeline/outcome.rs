//! Values flowing from site workers to the result collector.

use crate::error::FetchError;
use crate::meli::Site;
use rust_decimal::Decimal;
use std::sync::Arc;

/// A site's priciest listing, priced natively and in the reference currency.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteQuote {
    pub site: Arc<Site>,
    /// Price in the site's own currency
    pub native_price: Decimal,
    /// Price in the reference currency
    pub reference_price: Decimal,
    /// Reference units per native unit
    pub ratio: Decimal,
    pub item_title: String,
    pub permalink: String,
}

/// A site that could not be priced.
#[derive(Debug)]
pub struct SiteFailure {
    pub site: Arc<Site>,
    pub error: FetchError,
}

/// What one worker reports. Exactly one per spawned worker.
#[derive(Debug)]
pub enum SiteOutcome {
    Success(SiteQuote),
    Failure(SiteFailure),
}

impl SiteOutcome {
    pub fn failure(site: Arc<Site>, error: FetchError) -> Self {
        SiteOutcome::Failure(SiteFailure { site, error })
    }
}

/// Successful quotes in arrival order. Only ever appended to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    quotes: Vec<SiteQuote>,
}

impl ResultSet {
    pub fn push(&mut self, quote: SiteQuote) {
        self.quotes.push(quote);
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SiteQuote> {
        self.quotes.iter()
    }

    /// Looks up the quote for a site id.
    pub fn get(&self, site_id: &str) -> Option<&SiteQuote> {
        self.quotes.iter().find(|q| q.site.id == site_id)
    }

    /// Highest reference price across all sites.
    pub fn priciest(&self) -> Option<&SiteQuote> {
        self.quotes.iter().max_by(|a, b| a.reference_price.cmp(&b.reference_price))
    }

    /// Lowest reference price across all sites.
    pub fn cheapest(&self) -> Option<&SiteQuote> {
        self.quotes.iter().min_by(|a, b| a.reference_price.cmp(&b.reference_price))
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a SiteQuote;
    type IntoIter = std::slice::Iter<'a, SiteQuote>;

    fn into_iter(self) -> Self::IntoIter {
        self.quotes.iter()
    }
}

/// Everything the collector gathered, handed over once it has stopped.
#[derive(Debug, Default)]
pub struct Collection {
    pub results: ResultSet,
    pub failures: Vec<SiteFailure>,
    /// Total outcomes received, successes and failures alike
    pub received: usize,
}
