//! meli-compare - Highest-price search across every MercadoLibre site
//!
//! Searches all sites concurrently, normalizes each top listing into a
//! reference currency and optionally re-prices peso listings with a bank quote.

pub mod bank;
pub mod commands;
pub mod config;
pub mod error;
pub mod format;
pub mod meli;
pub mod pipeline;
pub mod report;

pub use bank::BankQuote;
pub use config::Config;
pub use error::{ErrorKind, FetchError};
pub use meli::{Listing, Site};
pub use pipeline::{Collection, Orchestrator, SiteQuote};
pub use report::ComparisonReport;
