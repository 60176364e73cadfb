//! Exchange quotes scraped from Banco de la Nación Argentina.
//!
//! Independent of the marketplace pipeline: fetches the bank's public page,
//! reads the buy/sell pair of one currency and averages them.

mod client;
mod models;
mod parser;

pub use client::{BankClient, ExchangeBoard};
pub use models::BankQuote;
pub use parser::parse_quote;
