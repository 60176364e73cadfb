//! Output formatting for comparison reports (table, JSON, markdown, CSV).

use crate::bank::BankQuote;
use crate::config::OutputFormat;
use crate::error::ErrorKind;
use crate::pipeline::{SiteFailure, SiteQuote};
use crate::report::ComparisonReport;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

/// Formats reports for output.
pub struct Formatter {
    format: OutputFormat,
}

#[derive(Serialize)]
struct ReportView<'a> {
    term: &'a str,
    reference_currency: &'a str,
    results: Vec<QuoteView<'a>>,
    failures: Vec<FailureView<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bank_quote: Option<BankView<'a>>,
}

#[derive(Serialize)]
struct QuoteView<'a> {
    site_id: &'a str,
    site_name: &'a str,
    currency: &'a str,
    native_price: Decimal,
    reference_price: Decimal,
    ratio: Decimal,
    title: &'a str,
    permalink: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    bank_price: Option<Decimal>,
}

#[derive(Serialize)]
struct FailureView<'a> {
    site_id: &'a str,
    site_name: &'a str,
    kind: ErrorKind,
    error: String,
}

#[derive(Serialize)]
struct BankView<'a> {
    #[serde(flatten)]
    quote: &'a BankQuote,
    #[serde(skip_serializing_if = "Option::is_none")]
    average: Option<Decimal>,
    spread: Decimal,
}

/// Rounds half to even, two decimals.
fn money(value: Decimal) -> String {
    format!("{:.2}", value.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven))
}

impl Formatter {
    /// Creates a new formatter.
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats the successful sites, plus the bank quote when present.
    pub fn format_report(&self, report: &ComparisonReport) -> String {
        match self.format {
            OutputFormat::Json => self.json_report(report),
            OutputFormat::Table => self.table_report(report),
            OutputFormat::Markdown => self.markdown_report(report),
            OutputFormat::Csv => self.csv_report(report),
        }
    }

    /// One line per failed site, meant for stderr.
    ///
    /// JSON output already carries failures, so this is empty in that format.
    pub fn format_failures(&self, report: &ComparisonReport) -> Vec<String> {
        if self.format == OutputFormat::Json {
            return Vec::new();
        }
        report.failures.iter().map(|f| Self::failure_line(f, &report.term)).collect()
    }

    fn failure_line(failure: &SiteFailure, term: &str) -> String {
        if failure.error.is_empty_result() {
            format!("Site {:?} has no listing for {:?}", failure.site.name, term)
        } else {
            format!("Site {:?} failed: {}", failure.site.name, failure.error)
        }
    }

    // JSON formatting

    fn json_report(&self, report: &ComparisonReport) -> String {
        let view = ReportView {
            term: &report.term,
            reference_currency: &report.reference_currency,
            results: report
                .results
                .iter()
                .map(|q| QuoteView {
                    site_id: &q.site.id,
                    site_name: &q.site.name,
                    currency: &q.site.default_currency_id,
                    native_price: q.native_price,
                    reference_price: q.reference_price,
                    ratio: q.ratio,
                    title: &q.item_title,
                    permalink: &q.permalink,
                    bank_price: report.bank_price(q),
                })
                .collect(),
            failures: report
                .failures
                .iter()
                .map(|f| FailureView {
                    site_id: &f.site.id,
                    site_name: &f.site.name,
                    kind: f.error.kind(),
                    error: f.error.to_string(),
                })
                .collect(),
            bank_quote: report.bank_quote.as_ref().map(|quote| BankView {
                quote,
                average: quote.average(),
                spread: quote.spread(),
            }),
        };

        serde_json::to_string_pretty(&view).unwrap_or_else(|_| "{}".to_string())
    }

    // Table formatting

    fn table_report(&self, report: &ComparisonReport) -> String {
        let mut lines = Vec::new();

        if let Some(bank) = &report.bank_quote {
            lines.push(Self::bank_line(bank));
            lines.push(String::new());
        }

        if report.results.is_empty() {
            lines.push(format!("No site has a listing for {:?}.", report.term));
            return lines.join("\n");
        }

        for quote in &report.results {
            lines.push(format!(
                "Buying {:?} on {:?} costs {} {} ({} {} at ratio {}):",
                report.term,
                quote.site.name,
                report.reference_currency,
                money(quote.reference_price),
                quote.site.default_currency_id,
                money(quote.native_price),
                quote.ratio
            ));
            lines.push(format!("--> Listed as {:?}", quote.item_title));
            if let Some(bank_price) = report.bank_price(quote) {
                lines.push(format!("--> At the bank average that is USD {}", money(bank_price)));
            }
        }

        if let (Some(top), Some(bottom)) = (report.results.priciest(), report.results.cheapest())
        {
            if report.results.len() > 1 {
                lines.push(String::new());
                lines.push(format!(
                    "Priciest: {} ({} {}), cheapest: {} ({} {})",
                    top.site.name,
                    report.reference_currency,
                    money(top.reference_price),
                    bottom.site.name,
                    report.reference_currency,
                    money(bottom.reference_price)
                ));
            }
        }

        lines.join("\n")
    }

    fn bank_line(bank: &BankQuote) -> String {
        format!(
            "Bank quote {}: buy {} / sell {} (average {})",
            bank.currency,
            money(bank.buy),
            money(bank.sell),
            bank.average().map_or_else(|| "n/a".to_string(), money)
        )
    }

    // Markdown formatting

    fn markdown_report(&self, report: &ComparisonReport) -> String {
        let mut lines = Vec::new();

        lines.push(format!("## {}", report.term));
        lines.push(String::new());

        if let Some(bank) = &report.bank_quote {
            lines.push(format!("*{}*", Self::bank_line(bank)));
            lines.push(String::new());
        }

        lines.push(format!(
            "| Site | Currency | Price | {} | Ratio | Listing |",
            report.reference_currency
        ));
        lines.push("|------|----------|-------|-----|-------|---------|".to_string());

        for quote in &report.results {
            let title = if quote.item_title.chars().count() > 40 {
                format!("{}...", quote.item_title.chars().take(37).collect::<String>())
            } else {
                quote.item_title.clone()
            };

            lines.push(format!(
                "| {} | {} | {} | {} | {} | [{}]({}) |",
                quote.site.name,
                quote.site.default_currency_id,
                money(quote.native_price),
                money(quote.reference_price),
                quote.ratio,
                title.replace('|', "\\|"),
                quote.permalink
            ));
        }

        lines.push(String::new());
        lines.push(format!(
            "*{} sites priced, {} failed*",
            report.results.len(),
            report.failures.len()
        ));

        lines.join("\n")
    }

    // CSV formatting

    fn csv_header(&self) -> String {
        "site_id,site_name,currency,native_price,reference_currency,reference_price,ratio,title,permalink"
            .to_string()
    }

    fn csv_report(&self, report: &ComparisonReport) -> String {
        let mut lines = Vec::new();
        lines.push(self.csv_header());

        for quote in &report.results {
            lines.push(Self::csv_row(quote, &report.reference_currency));
        }

        lines.join("\n")
    }

    fn csv_row(quote: &SiteQuote, reference_currency: &str) -> String {
        format!(
            "{},{},{},{},{},{},{},{},{}",
            quote.site.id,
            Self::csv_escape(&quote.site.name),
            quote.site.default_currency_id,
            quote.native_price,
            reference_currency,
            quote.reference_price,
            quote.ratio,
            Self::csv_escape(&quote.item_title),
            quote.permalink
        )
    }

    fn csv_escape(s: &str) -> String {
        if s.contains(',') || s.contains('"') || s.contains('\n') {
            format!("\"{}\"", s.replace('"', "\"\""))
        } else {
            s.to_string()
        }
    }
}
