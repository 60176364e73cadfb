//! MercadoLibre API access: site discovery, search and currency conversion.

pub mod client;
pub mod models;

pub use client::{CurrencyRates, MeliClient, SiteDirectory, SiteQuerier};
pub use models::{Listing, Site};
