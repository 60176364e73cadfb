//! Per-site worker: search and currency lookup in parallel, one outcome out.

use crate::error::{FetchError, Result};
use crate::meli::{CurrencyRates, Listing, Site, SiteQuerier};
use crate::pipeline::outcome::{SiteOutcome, SiteQuote};
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Prices the top listing of a single site.
pub struct SiteWorker {
    querier: Arc<dyn SiteQuerier>,
    rates: Arc<dyn CurrencyRates>,
    term: Arc<str>,
    site: Arc<Site>,
    reference: Arc<str>,
}

impl SiteWorker {
    pub fn new(
        querier: Arc<dyn SiteQuerier>,
        rates: Arc<dyn CurrencyRates>,
        term: Arc<str>,
        site: Arc<Site>,
        reference: Arc<str>,
    ) -> Self {
        Self { querier, rates, term, site, reference }
    }

    /// Sends exactly one outcome on `outcomes`, then returns.
    ///
    /// The currency lookup runs as a nested task owned by this worker. When
    /// the search fails the failure goes out right away, and the lookup is
    /// joined afterwards. If the worker unwinds or is cancelled first, the
    /// lookup is aborted with it.
    pub async fn run(self, outcomes: mpsc::Sender<SiteOutcome>) {
        let mut rate_lookup = self.spawn_rate_lookup();

        let outcome = match self.querier.search_top(&self.term, &self.site).await {
            Ok(listing) => {
                let ratio = join_rate(&mut rate_lookup).await;
                self.settle(listing, ratio)
            }
            Err(error) => SiteOutcome::failure(Arc::clone(&self.site), error),
        };

        if outcomes.send(outcome).await.is_err() {
            warn!("Collector is gone, dropping outcome for {}", self.site.id);
        }

        if !rate_lookup.is_empty() {
            match join_rate(&mut rate_lookup).await {
                Ok(ratio) => debug!("Discarding ratio {} for {}", ratio, self.site.id),
                Err(e) => debug!("Discarding ratio error for {}: {}", self.site.id, e),
            }
        }
    }

    fn spawn_rate_lookup(&self) -> JoinSet<Result<Decimal>> {
        let rates = Arc::clone(&self.rates);
        let source = self.site.default_currency_id.clone();
        let target = Arc::clone(&self.reference);

        let mut lookup = JoinSet::new();
        lookup.spawn(async move { rates.currency_ratio(&source, &target).await });
        lookup
    }

    fn settle(&self, listing: Listing, ratio: Result<Decimal>) -> SiteOutcome {
        let quote = ratio
            .and_then(|ratio| price_quote(Arc::clone(&self.site), listing, ratio, &self.reference));

        match quote {
            Ok(quote) => {
                debug!(
                    "{}: {} {} ({} {})",
                    self.site.id,
                    self.site.default_currency_id,
                    quote.native_price,
                    self.reference,
                    quote.reference_price
                );
                SiteOutcome::Success(quote)
            }
            Err(error) => SiteOutcome::failure(Arc::clone(&self.site), error),
        }
    }
}

async fn join_rate(lookup: &mut JoinSet<Result<Decimal>>) -> Result<Decimal> {
    match lookup.join_next().await {
        Some(joined) => joined.map_err(|e| FetchError::Task(format!("currency lookup: {}", e)))?,
        None => Err(FetchError::Task("currency lookup already joined".to_string())),
    }
}

/// Normalizes a listing price into native and reference currency.
///
/// `ratio` is always source to reference, so a listing that is already in the
/// reference currency has to be divided back to recover the native price.
pub fn price_quote(
    site: Arc<Site>,
    listing: Listing,
    ratio: Decimal,
    reference: &str,
) -> Result<SiteQuote> {
    let (native_price, reference_price) = if listing.currency_id.eq_ignore_ascii_case(reference) {
        let native = listing.price.checked_div(ratio).ok_or_else(|| {
            FetchError::parse(
                "normalizing price",
                format!("cannot invert ratio {} for {}", ratio, site.default_currency_id),
            )
        })?;
        (native, listing.price)
    } else {
        let converted = listing.price.checked_mul(ratio).ok_or_else(|| {
            FetchError::parse(
                "normalizing price",
                format!("{} * {} overflows", listing.price, ratio),
            )
        })?;
        (listing.price, converted)
    };

    Ok(SiteQuote {
        site,
        native_price,
        reference_price,
        ratio,
        item_title: listing.title,
        permalink: listing.permalink,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use async_trait::async_trait;
    use std::str::FromStr;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn listing(price: &str, currency: &str) -> Listing {
        Listing {
            title: "iPhone 11 Pro Max".to_string(),
            permalink: "https://articulo.mercadolibre.com/1".to_string(),
            price: dec(price),
            currency_id: currency.to_string(),
        }
    }

    /// Search mock returning a fixed result.
    struct FixedSearch(std::result::Result<Listing, ErrorKind>);

    #[async_trait]
    impl SiteQuerier for FixedSearch {
        async fn search_top(&self, term: &str, _site: &Site) -> Result<Listing> {
            match &self.0 {
                Ok(listing) => Ok(listing.clone()),
                Err(ErrorKind::EmptyResult) => {
                    Err(FetchError::EmptyResult { term: term.to_string() })
                }
                Err(_) => Err(FetchError::Status { context: "searching site", status: 503 }),
            }
        }
    }

    /// Search mock that panics mid-request.
    struct PanickingSearch;

    #[async_trait]
    impl SiteQuerier for PanickingSearch {
        async fn search_top(&self, _term: &str, site: &Site) -> Result<Listing> {
            tokio::time::sleep(Duration::from_millis(10)).await;
            panic!("search blew up for {}", site.id);
        }
    }

    /// Search mock that never answers.
    struct StalledSearch;

    #[async_trait]
    impl SiteQuerier for StalledSearch {
        async fn search_top(&self, _term: &str, _site: &Site) -> Result<Listing> {
            std::future::pending().await
        }
    }

    /// Rate mock that sleeps before answering and records that it finished.
    struct SlowRates {
        ratio: Option<Decimal>,
        delay: Duration,
        finished: Arc<AtomicBool>,
    }

    #[async_trait]
    impl CurrencyRates for SlowRates {
        async fn currency_ratio(&self, _source: &str, _target: &str) -> Result<Decimal> {
            tokio::time::sleep(self.delay).await;
            self.finished.store(true, Ordering::SeqCst);
            self.ratio.ok_or(FetchError::Status { context: "fetching currency ratio", status: 500 })
        }
    }

    async fn run_worker(
        search: FixedSearch,
        ratio: Option<Decimal>,
        delay: Duration,
        site: Site,
    ) -> (SiteOutcome, Arc<AtomicBool>) {
        let finished = Arc::new(AtomicBool::new(false));
        let rates = SlowRates { ratio, delay, finished: Arc::clone(&finished) };
        let worker = SiteWorker::new(
            Arc::new(search),
            Arc::new(rates),
            Arc::from("iPhone 11 Pro Max"),
            Arc::new(site),
            Arc::from("USD"),
        );

        let (tx, mut rx) = mpsc::channel(1);
        let handle = tokio::spawn(worker.run(tx));
        let outcome = rx.recv().await.expect("worker sent nothing");
        handle.await.unwrap();

        assert!(rx.recv().await.is_none(), "worker sent more than one outcome");
        (outcome, finished)
    }

    #[test]
    fn test_price_quote_foreign_currency() {
        let site = Arc::new(Site::new("MLB", "Brasil", "BRL"));
        let quote = price_quote(site, listing("5000.00", "BRL"), dec("0.18"), "USD").unwrap();

        assert_eq!(quote.native_price, dec("5000.00"));
        assert_eq!(quote.reference_price, dec("900.00"));
        assert_eq!(quote.native_price * quote.ratio, quote.reference_price);
    }

    #[test]
    fn test_price_quote_reference_currency() {
        let site = Arc::new(Site::new("MEC", "Ecuador", "USD"));
        let quote = price_quote(site, listing("999.00", "USD"), Decimal::ONE, "USD").unwrap();

        assert_eq!(quote.native_price, dec("999.00"));
        assert_eq!(quote.reference_price, dec("999.00"));
        assert_eq!(quote.ratio, Decimal::ONE);
    }

    #[test]
    fn test_price_quote_usd_listing_on_foreign_site_round_trips() {
        // Listing published in USD on a site whose currency is ARS
        let site = Arc::new(Site::new("MLA", "Argentina", "ARS"));
        let quote = price_quote(site, listing("1500", "USD"), dec("0.0149"), "USD").unwrap();

        assert_eq!(quote.reference_price, dec("1500"));
        let rebuilt = quote.native_price * quote.ratio;
        assert!((rebuilt - quote.reference_price).abs() < dec("0.000001"));
    }

    #[test]
    fn test_price_quote_zero_ratio_cannot_invert() {
        let site = Arc::new(Site::new("MLV", "Venezuela", "VES"));
        let err = price_quote(site, listing("10", "USD"), Decimal::ZERO, "USD").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }

    #[tokio::test]
    async fn test_worker_success() {
        let (outcome, _) = run_worker(
            FixedSearch(Ok(listing("5000.00", "BRL"))),
            Some(dec("0.18")),
            Duration::from_millis(20),
            Site::new("MLB", "Brasil", "BRL"),
        )
        .await;

        match outcome {
            SiteOutcome::Success(quote) => {
                assert_eq!(quote.site.id, "MLB");
                assert_eq!(quote.reference_price, dec("900.00"));
                assert_eq!(quote.item_title, "iPhone 11 Pro Max");
            }
            SiteOutcome::Failure(f) => panic!("unexpected failure: {}", f.error),
        }
    }

    #[tokio::test]
    async fn test_worker_search_failure_joins_rate_lookup() {
        let (outcome, finished) = run_worker(
            FixedSearch(Err(ErrorKind::Network)),
            Some(dec("0.18")),
            Duration::from_millis(100),
            Site::new("MLC", "Chile", "CLP"),
        )
        .await;

        match outcome {
            SiteOutcome::Failure(f) => {
                assert_eq!(f.site.id, "MLC");
                assert_eq!(f.error.kind(), ErrorKind::Network);
            }
            SiteOutcome::Success(_) => panic!("search failed, expected a failure"),
        }
        // The nested lookup completed before the worker returned
        assert!(finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_worker_empty_search_is_failure() {
        let (outcome, _) = run_worker(
            FixedSearch(Err(ErrorKind::EmptyResult)),
            Some(Decimal::ONE),
            Duration::ZERO,
            Site::new("MPA", "Panamá", "USD"),
        )
        .await;

        match outcome {
            SiteOutcome::Failure(f) => assert!(f.error.is_empty_result()),
            SiteOutcome::Success(_) => panic!("empty search must not produce a quote"),
        }
    }

    #[tokio::test]
    async fn test_worker_rate_failure() {
        let (outcome, _) = run_worker(
            FixedSearch(Ok(listing("100", "UYU"))),
            None,
            Duration::ZERO,
            Site::new("MLU", "Uruguay", "UYU"),
        )
        .await;

        match outcome {
            SiteOutcome::Failure(f) => {
                assert_eq!(f.error.kind(), ErrorKind::Network);
                assert!(f.error.to_string().contains("currency ratio"));
            }
            SiteOutcome::Success(_) => panic!("rate failed, expected a failure"),
        }
    }

    fn slow_worker(
        search: impl SiteQuerier + 'static,
        delay: Duration,
    ) -> (SiteWorker, Arc<AtomicBool>) {
        let finished = Arc::new(AtomicBool::new(false));
        let rates = SlowRates { ratio: Some(dec("0.18")), delay, finished: Arc::clone(&finished) };
        let worker = SiteWorker::new(
            Arc::new(search),
            Arc::new(rates),
            Arc::from("iPhone 11 Pro Max"),
            Arc::new(Site::new("MLB", "Brasil", "BRL")),
            Arc::from("USD"),
        );
        (worker, finished)
    }

    #[tokio::test]
    async fn test_panicking_search_aborts_rate_lookup() {
        let (worker, finished) = slow_worker(PanickingSearch, Duration::from_millis(200));

        let (tx, mut rx) = mpsc::channel(1);
        let joined = tokio::spawn(worker.run(tx)).await;
        assert!(joined.unwrap_err().is_panic());
        assert!(rx.recv().await.is_none());

        // Well past the lookup delay: an orphaned lookup would have finished by now
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(!finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_cancelled_worker_aborts_rate_lookup() {
        let (worker, finished) = slow_worker(StalledSearch, Duration::from_millis(100));

        let (tx, _rx) = mpsc::channel(1);
        let handle = tokio::spawn(worker.run(tx));
        tokio::time::sleep(Duration::from_millis(20)).await;

        handle.abort();
        assert!(handle.await.unwrap_err().is_cancelled());

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(!finished.load(Ordering::SeqCst));
    }
}
