//! Single consumer draining worker outcomes into the result set.

use crate::error::FetchError;
use crate::pipeline::outcome::{Collection, SiteOutcome};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Owns the collection while workers are running.
pub struct ResultCollector {
    outcomes: mpsc::Receiver<SiteOutcome>,
    collection: Collection,
}

/// Handle held by the orchestrator to stop the collector and take its results.
pub struct CollectorHandle {
    stop: oneshot::Sender<()>,
    task: JoinHandle<Collection>,
}

impl ResultCollector {
    pub fn new(outcomes: mpsc::Receiver<SiteOutcome>) -> Self {
        Self { outcomes, collection: Collection::default() }
    }

    /// Spawns the collector loop on its own task.
    pub fn spawn(outcomes: mpsc::Receiver<SiteOutcome>) -> CollectorHandle {
        let (stop, stop_rx) = oneshot::channel();
        let task = tokio::spawn(Self::new(outcomes).run(stop_rx));
        CollectorHandle { stop, task }
    }

    /// Records outcomes until stopped or until every sender is gone.
    ///
    /// Outcomes take priority over the stop signal, and whatever is still
    /// buffered when the stop arrives is drained before returning.
    pub async fn run(mut self, mut stop: oneshot::Receiver<()>) -> Collection {
        loop {
            tokio::select! {
                biased;

                outcome = self.outcomes.recv() => match outcome {
                    Some(outcome) => self.record(outcome),
                    None => {
                        debug!("All outcome senders closed");
                        break;
                    }
                },

                _ = &mut stop => {
                    while let Ok(outcome) = self.outcomes.try_recv() {
                        self.record(outcome);
                    }
                    debug!("Collector stopped after {} outcomes", self.collection.received);
                    break;
                }
            }
        }

        self.collection
    }

    fn record(&mut self, outcome: SiteOutcome) {
        self.collection.received += 1;

        match outcome {
            SiteOutcome::Success(quote) => {
                debug!("Collected {} ({})", quote.site.name, quote.site.id);
                self.collection.results.push(quote);
            }
            SiteOutcome::Failure(failure) => {
                info!("Site {:?} failed: {}", failure.site.name, failure.error);
                self.collection.failures.push(failure);
            }
        }
    }
}

impl CollectorHandle {
    /// Signals the collector to stop and waits for its collection.
    ///
    /// Only call this once every outcome send has completed.
    pub async fn stop(self) -> Result<Collection, FetchError> {
        // The collector may already have exited on a closed channel
        let _ = self.stop.send(());

        self.task.await.map_err(|e| FetchError::Task(format!("result collector: {}", e)))
    }
}
