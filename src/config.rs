//! Configuration management with TOML, environment variables, and CLI overrides.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Application configuration with layered loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// MercadoLibre API root
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Bank page carrying the exchange board
    #[serde(default = "default_bank_url")]
    pub bank_url: String,

    /// Currency every price is normalized into
    #[serde(default = "default_reference_currency")]
    pub reference_currency: String,

    /// Search term used when none is given on the command line
    #[serde(default = "default_search")]
    pub default_search: String,

    /// Row label of the currency on the bank board
    #[serde(default = "default_bank_currency_label")]
    pub bank_currency_label: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Output format
    #[serde(default)]
    pub format: OutputFormat,

    /// Also scrape the bank quote
    #[serde(default)]
    pub bank_quote: bool,
}

fn default_api_base_url() -> String {
    "https://api.mercadolibre.com".to_string()
}

fn default_bank_url() -> String {
    "http://www.bna.com.ar/Personas".to_string()
}

fn default_reference_currency() -> String {
    "USD".to_string()
}

fn default_search() -> String {
    "iPhone 11 Pro Max".to_string()
}

fn default_bank_currency_label() -> String {
    "Dolar U.S.A".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            bank_url: default_bank_url(),
            reference_currency: default_reference_currency(),
            default_search: default_search(),
            bank_currency_label: default_bank_currency_label(),
            timeout_secs: default_timeout_secs(),
            format: OutputFormat::Table,
            bank_quote: false,
        }
    }
}

impl Config {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading config from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Loads configuration with fallback to default locations.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit_path {
            return Self::from_file(path);
        }

        let local_config = Path::new("config.toml");
        if local_config.exists() {
            debug!("Found config.toml in current directory");
            return Self::from_file(local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let xdg_config = config_dir.join("meli-compare").join("config.toml");
            if xdg_config.exists() {
                debug!("Found config in XDG config directory");
                return Self::from_file(xdg_config);
            }
        }

        debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Applies environment variable overrides.
    pub fn with_env(mut self) -> Self {
        if let Ok(url) = std::env::var("MELI_API_URL") {
            self.api_base_url = url;
        }

        if let Ok(url) = std::env::var("MELI_BANK_URL") {
            self.bank_url = url;
        }

        if let Ok(code) = std::env::var("MELI_REFERENCE") {
            if !code.trim().is_empty() {
                self.reference_currency = code.trim().to_uppercase();
            }
        }

        if let Ok(timeout) = std::env::var("MELI_TIMEOUT") {
            if let Ok(t) = timeout.parse() {
                self.timeout_secs = t;
            }
        }

        self
    }
}

/// Output format for results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Markdown,
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown format: {}. Use: table, json, markdown, csv", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}
