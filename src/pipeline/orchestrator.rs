//! Fans a search out to every site and gathers the outcomes.

use crate::error::{FetchError, Result};
use crate::meli::{CurrencyRates, Site, SiteDirectory, SiteQuerier};
use crate::pipeline::collector::ResultCollector;
use crate::pipeline::outcome::{Collection, SiteOutcome};
use crate::pipeline::worker::SiteWorker;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{error, info};

/// Capacity of the outcome channel. Shutdown ordering does not rely on it.
const OUTCOME_BUFFER: usize = 1;

/// Runs one search across all discovered sites.
pub struct Orchestrator {
    directory: Arc<dyn SiteDirectory>,
    querier: Arc<dyn SiteQuerier>,
    rates: Arc<dyn CurrencyRates>,
    reference: Arc<str>,
}

impl Orchestrator {
    pub fn new(
        directory: Arc<dyn SiteDirectory>,
        querier: Arc<dyn SiteQuerier>,
        rates: Arc<dyn CurrencyRates>,
        reference: impl Into<Arc<str>>,
    ) -> Self {
        Self { directory, querier, rates, reference: reference.into() }
    }

    /// Builds an orchestrator where one API client serves every role.
    pub fn with_client<C>(client: Arc<C>, reference: impl Into<Arc<str>>) -> Self
    where
        C: SiteDirectory + SiteQuerier + CurrencyRates + 'static,
    {
        Self::new(client.clone(), client.clone(), client, reference)
    }

    /// Searches every site for `term`.
    ///
    /// Fails only when site discovery fails; every per-site problem ends up
    /// in `Collection::failures`.
    pub async fn run(&self, term: &str) -> Result<Collection> {
        let sites = self.directory.sites().await?;
        info!("Searching {} sites for {:?}", sites.len(), term);

        let term: Arc<str> = Arc::from(term);
        let (tx, rx) = mpsc::channel(OUTCOME_BUFFER);

        let mut workers = JoinSet::new();
        let mut site_of_task = HashMap::with_capacity(sites.len());

        for site in sites {
            let site = Arc::new(site);
            let worker = SiteWorker::new(
                Arc::clone(&self.querier),
                Arc::clone(&self.rates),
                Arc::clone(&term),
                Arc::clone(&site),
                Arc::clone(&self.reference),
            );
            let handle = workers.spawn(worker.run(tx.clone()));
            site_of_task.insert(handle.id(), site);
        }
        let spawned = site_of_task.len();

        let collector = ResultCollector::spawn(rx);

        // Every worker has finished its send once it is joined here
        while let Some(joined) = workers.join_next_with_id().await {
            if let Err(e) = joined {
                let site = site_of_task.get(&e.id()).cloned().unwrap_or_else(unknown_site);
                error!("Worker for {} did not finish: {}", site.id, e);

                let outcome = SiteOutcome::failure(site, FetchError::Task(e.to_string()));
                // The collector only exits early once every sender is gone,
                // and this one is still alive
                let _ = tx.send(outcome).await;
            }
        }
        drop(tx);

        let collection = collector.stop().await?;

        if collection.received != spawned {
            error!("Expected {} outcomes, collected {}", spawned, collection.received);
        }
        info!(
            "{} sites priced, {} failed",
            collection.results.len(),
            collection.failures.len()
        );

        Ok(collection)
    }
}

fn unknown_site() -> Arc<Site> {
    Arc::new(Site::new("?", "unknown site", "?"))
}
