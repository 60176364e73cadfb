//! Concurrent search pipeline.
//!
//! The orchestrator spawns one [`SiteWorker`] per site. Each worker searches
//! its site while a nested task fetches the currency ratio, then reports a
//! single [`SiteOutcome`] over a shared channel. A lone [`ResultCollector`]
//! drains that channel until the orchestrator, having joined every worker,
//! tells it to stop.

pub mod collector;
pub mod orchestrator;
pub mod outcome;
pub mod worker;

pub use collector::{CollectorHandle, ResultCollector};
pub use orchestrator::Orchestrator;
pub use outcome::{Collection, ResultSet, SiteFailure, SiteOutcome, SiteQuote};
pub use worker::{price_quote, SiteWorker};
