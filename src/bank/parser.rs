//! HTML parser for the bank's exchange board.

use super::models::BankQuote;
use crate::error::{FetchError, Result};
use rust_decimal::Decimal;
use scraper::{ElementRef, Html, Selector};
use std::str::FromStr;
use std::sync::LazyLock;
use tracing::{debug, trace};

// The board is a table with one row per currency: a title cell, then buy, then sell.
mod selectors {
    use super::*;

    pub static BOARD_ROW: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("#billetes tr").unwrap());

    pub static CELL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").unwrap());

    pub const TITLE_CLASS: &str = "tit";
}

/// Extracts the buy/sell quote for the row labelled `label`.
pub fn parse_quote(html: &str, label: &str) -> Result<BankQuote> {
    let document = Html::parse_document(html);

    let mut rows = 0;
    for row in document.select(&selectors::BOARD_ROW) {
        rows += 1;
        let cells: Vec<ElementRef> = row.select(&selectors::CELL).collect();

        let Some(title) = cells.first() else {
            continue;
        };
        let is_title = title.value().classes().any(|c| c == selectors::TITLE_CLASS);
        if !is_title || cell_text(title) != label {
            trace!("Skipping board row {:?}", cell_text(title));
            continue;
        }

        let buy = cells
            .get(1)
            .ok_or_else(|| FetchError::UnexpectedHtml(format!("{} row has no buy cell", label)))?;
        let sell = cells
            .get(2)
            .ok_or_else(|| FetchError::UnexpectedHtml(format!("{} row has no sell cell", label)))?;

        let quote = BankQuote::new(
            label,
            parse_amount(&cell_text(buy), "buy price")?,
            parse_amount(&cell_text(sell), "sell price")?,
        );
        if quote.average().is_none() {
            return Err(FetchError::parse(
                "bank quote",
                format!("{} buy and sell prices overflow", label),
            ));
        }
        debug!("Parsed {} quote: buy {} sell {}", label, quote.buy, quote.sell);
        return Ok(quote);
    }

    if rows == 0 {
        return Err(FetchError::UnexpectedHtml("exchange board not found".to_string()));
    }
    Err(FetchError::UnexpectedHtml(format!("no {:?} row on the exchange board", label)))
}

fn cell_text(cell: &ElementRef) -> String {
    cell.text().collect::<String>().trim().to_string()
}

/// Parses board amounts, which use a comma as decimal separator ("58,2500").
fn parse_amount(text: &str, what: &'static str) -> Result<Decimal> {
    if text.contains('-') {
        return Err(FetchError::parse(what, format!("{:?} is not a positive amount", text)));
    }

    let cleaned: String =
        text.chars().filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',').collect();

    // A comma, when present, is the decimal separator and periods group thousands
    let normalized =
        if cleaned.contains(',') { cleaned.replace('.', "").replace(',', ".") } else { cleaned };

    Decimal::from_str(&normalized)
        .map_err(|e| FetchError::parse(what, format!("{:?} is not a number: {}", text, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn board(rows: &str) -> String {
        format!(
            r#"<html><body><div id="billetes"><table>
                <thead><tr><th></th><th>Compra</th><th>Venta</th></tr></thead>
                <tbody>{}</tbody>
            </table></div></body></html>"#,
            rows
        )
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("58,2500", "buy").unwrap(), dec("58.25"));
        assert_eq!(parse_amount(" 1.050,75 ", "buy").unwrap(), dec("1050.75"));
        assert_eq!(parse_amount("63.25", "sell").unwrap(), dec("63.25"));
        assert_eq!(parse_amount("$ 60", "sell").unwrap(), dec("60"));
    }

    #[test]
    fn test_parse_amount_invalid() {
        let err = parse_amount("-", "buy price").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
        assert!(err.to_string().contains("buy price"));

        assert!(parse_amount("", "sell price").is_err());
    }

    #[test]
    fn test_parse_amount_rejects_sign() {
        let err = parse_amount("-58,2500", "buy price").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
        assert!(err.to_string().contains("positive"));

        assert!(parse_amount("58,25-", "sell price").is_err());
    }

    #[test]
    fn test_parse_quote_dollar_row() {
        let html = board(
            r#"<tr><td class="tit">Dolar U.S.A</td><td>58,2500</td><td>63,2500</td></tr>
               <tr><td class="tit">Euro</td><td>64,0000</td><td>69,0000</td></tr>"#,
        );

        let quote = parse_quote(&html, "Dolar U.S.A").unwrap();
        assert_eq!(quote.currency, "Dolar U.S.A");
        assert_eq!(quote.buy, dec("58.25"));
        assert_eq!(quote.sell, dec("63.25"));
        assert_eq!(quote.average(), Some(dec("60.75")));
    }

    #[test]
    fn test_parse_quote_other_label() {
        let html = board(
            r#"<tr><td class="tit">Dolar U.S.A</td><td>58,2500</td><td>63,2500</td></tr>
               <tr><td class="tit">Euro</td><td>64,0000</td><td>69,0000</td></tr>"#,
        );

        let quote = parse_quote(&html, "Euro").unwrap();
        assert_eq!(quote.buy, dec("64"));
        assert_eq!(quote.sell, dec("69"));
    }

    #[test]
    fn test_parse_quote_ignores_untitled_cells() {
        // Same text but without the title class is not a section start
        let html = board(
            r#"<tr><td>Dolar U.S.A</td><td>1,0000</td><td>2,0000</td></tr>
               <tr><td class="tit">Dolar U.S.A</td><td>58,0000</td><td>62,0000</td></tr>"#,
        );

        let quote = parse_quote(&html, "Dolar U.S.A").unwrap();
        assert_eq!(quote.average(), Some(dec("60")));
    }

    #[test]
    fn test_parse_quote_missing_row() {
        let html = board(r#"<tr><td class="tit">Euro</td><td>64,0000</td><td>69,0000</td></tr>"#);

        let err = parse_quote(&html, "Dolar U.S.A").unwrap_err();
        assert!(matches!(err, FetchError::UnexpectedHtml(_)));
        assert!(err.to_string().contains("Dolar U.S.A"));
    }

    #[test]
    fn test_parse_quote_missing_board() {
        let err = parse_quote("<html><body><p>Mantenimiento</p></body></html>", "Dolar U.S.A")
            .unwrap_err();
        assert!(err.to_string().contains("exchange board not found"));
    }

    #[test]
    fn test_parse_quote_missing_sell_cell() {
        let html = board(r#"<tr><td class="tit">Dolar U.S.A</td><td>58,2500</td></tr>"#);

        let err = parse_quote(&html, "Dolar U.S.A").unwrap_err();
        assert!(err.to_string().contains("no sell cell"));
    }

    #[test]
    fn test_parse_quote_overflowing_amounts() {
        let huge = "79228162514264337593543950335";
        let html = board(&format!(
            r#"<tr><td class="tit">Dolar U.S.A</td><td>{}</td><td>{}</td></tr>"#,
            huge, huge
        ));

        let err = parse_quote(&html, "Dolar U.S.A").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
        assert!(err.to_string().contains("overflow"));
    }

    #[test]
    fn test_parse_quote_negative_amount() {
        let html =
            board(r#"<tr><td class="tit">Dolar U.S.A</td><td>-58,25</td><td>63,25</td></tr>"#);

        let err = parse_quote(&html, "Dolar U.S.A").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }

    #[test]
    fn test_parse_quote_garbled_amount() {
        let html =
            board(r#"<tr><td class="tit">Dolar U.S.A</td><td>consultar</td><td>63,25</td></tr>"#);

        let err = parse_quote(&html, "Dolar U.S.A").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }
}
