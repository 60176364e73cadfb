//! Data models for the bank exchange board.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Buy and sell price of one foreign currency, in pesos.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankQuote {
    /// Row label on the board, e.g. "Dolar U.S.A"
    pub currency: String,
    /// Price the bank pays
    pub buy: Decimal,
    /// Price the bank charges
    pub sell: Decimal,
}

impl BankQuote {
    pub fn new(currency: impl Into<String>, buy: Decimal, sell: Decimal) -> Self {
        Self { currency: currency.into(), buy, sell }
    }

    /// Midpoint between buy and sell, `None` if the sum overflows.
    pub fn average(&self) -> Option<Decimal> {
        self.buy.checked_add(self.sell)?.checked_div(Decimal::TWO)
    }

    /// Converts a peso amount into the quoted currency at the average rate.
    ///
    /// Returns `None` when the average is zero or cannot be computed.
    pub fn convert(&self, pesos: Decimal) -> Option<Decimal> {
        pesos.checked_div(self.average()?)
    }

    /// Spread between sell and buy.
    pub fn spread(&self) -> Decimal {
        self.sell - self.buy
    }
}
