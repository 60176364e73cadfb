//! meli-compare - Highest-price search across every MercadoLibre site

use anyhow::Result;
use clap::Parser;
use meli_compare::commands::CompareCommand;
use meli_compare::config::{Config, OutputFormat};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "meli-compare",
    version,
    about = "Find the priciest MercadoLibre listing of a product on every site",
    long_about = "Searches every MercadoLibre site concurrently and prices each site's most \
                  expensive listing in a common reference currency."
)]
struct Cli {
    /// Search terms (defaults to the configured search)
    terms: Vec<String>,

    /// Output format
    #[arg(short, long)]
    format: Option<OutputFormat>,

    /// Reference currency prices are normalized into
    #[arg(long, value_name = "CODE")]
    reference: Option<String>,

    /// Also scrape the bank quote and re-price peso listings with it
    #[arg(long)]
    bank: bool,

    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new(Level::DEBUG.to_string())
    } else {
        EnvFilter::from_default_env().add_directive(Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Load config with layered overrides
    let mut config = Config::load(cli.config.as_deref())?.with_env();

    // Apply CLI overrides
    if let Some(format) = cli.format {
        config.format = format;
    }
    if let Some(reference) = cli.reference {
        config.reference_currency = reference.trim().to_uppercase();
    }
    if cli.bank {
        config.bank_quote = true;
    }

    let term = cli.terms.join(" ");
    let cmd = CompareCommand::new(config);
    let output = cmd.execute(&term).await?;

    println!("{}", output.report);
    for line in &output.failures {
        eprintln!("{}", line);
    }

    // Results are already printed; a requested bank quote still fails the run
    match output.bank_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
