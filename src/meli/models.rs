//! Data models for MercadoLibre API responses.

use crate::error::{FetchError, Result};
use rust_decimal::Decimal;
use serde::{de, Deserialize, Deserializer, Serialize};
use std::str::FromStr;

/// A regional MercadoLibre site (MLA is Argentina, MLB is Brazil, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    /// Site identifier used in search URLs
    pub id: String,
    /// Display name, usually the country
    pub name: String,
    /// Currency listings are normally priced in
    pub default_currency_id: String,
}

impl Site {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        default_currency_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            default_currency_id: default_currency_id.into(),
        }
    }
}

/// The top listing returned by a site search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    pub title: String,
    pub permalink: String,
    pub price: Decimal,
    pub currency_id: String,
}

/// One page of search results. Only the fields the comparison needs.
#[derive(Debug, Deserialize)]
pub struct SearchPage {
    pub results: Vec<SearchEntry>,
}

#[derive(Debug, Deserialize)]
pub struct SearchEntry {
    #[serde(default, deserialize_with = "optional_amount")]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub permalink: String,
    #[serde(default)]
    pub currency_id: Option<String>,
}

impl SearchPage {
    /// Returns the first entry, which is the priciest when sorted by `price_desc`.
    pub fn into_top_listing(self, term: &str) -> Result<Listing> {
        let entry = self
            .results
            .into_iter()
            .next()
            .ok_or_else(|| FetchError::EmptyResult { term: term.to_string() })?;

        let price = entry
            .price
            .ok_or_else(|| FetchError::parse("search result", "top listing has no price"))?;
        let currency_id = entry
            .currency_id
            .ok_or_else(|| FetchError::parse("search result", "top listing has no currency"))?;

        Ok(Listing { title: entry.title, permalink: entry.permalink, price, currency_id })
    }
}

/// Body of the currency conversion endpoint.
#[derive(Debug, Deserialize)]
pub struct ConversionRatio {
    #[serde(deserialize_with = "amount")]
    pub ratio: Decimal,
}

/// Prices show up as JSON numbers on most sites and as strings on a few.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawAmount {
    Number(f64),
    Text(String),
}

impl RawAmount {
    fn into_decimal<E: de::Error>(self) -> std::result::Result<Decimal, E> {
        match self {
            RawAmount::Number(n) => decimal_from_f64(n)
                .ok_or_else(|| E::custom(format!("amount {} is out of range", n))),
            RawAmount::Text(s) => Decimal::from_str(s.trim())
                .map_err(|e| E::custom(format!("invalid amount {:?}: {}", s, e))),
        }
    }
}

fn amount<'de, D>(deserializer: D) -> std::result::Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    RawAmount::deserialize(deserializer)?.into_decimal()
}

fn optional_amount<'de, D>(deserializer: D) -> std::result::Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<RawAmount>::deserialize(deserializer)?.map(RawAmount::into_decimal).transpose()
}

/// Converts through the shortest round-trip text so `0.18` stays `0.18`.
pub fn decimal_from_f64(value: f64) -> Option<Decimal> {
    if !value.is_finite() {
        return None;
    }
    Decimal::from_str(&value.to_string()).ok()
}
