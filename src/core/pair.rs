//! Currency pair symbols

use crate::core::error::QuoteError;
use std::fmt::Display;
use std::str::FromStr;

/// A currency pair such as "EUR/USD".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CurrencyPair {
    pub base: String,
    pub quote: String,
}

impl CurrencyPair {
    /// Compact upstream form with the separator stripped, e.g. "EURUSD".
    pub fn compact(&self) -> String {
        format!("{}{}", self.base, self.quote)
    }
}

impl Display for CurrencyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

fn is_currency_code(code: &str) -> bool {
    code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic())
}

impl FromStr for CurrencyPair {
    type Err = QuoteError;

    /// Accepts "EUR/USD" as well as the compact "EURUSD" form. Codes are
    /// upper-cased.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (base, quote) = match trimmed.split_once('/') {
            Some((base, quote)) => (base.trim(), quote.trim()),
            None if trimmed.len() == 6 && trimmed.is_ascii() => trimmed.split_at(3),
            None => return Err(QuoteError::InvalidSymbol(s.to_string())),
        };

        if !is_currency_code(base) || !is_currency_code(quote) {
            return Err(QuoteError::InvalidSymbol(s.to_string()));
        }

        Ok(CurrencyPair {
            base: base.to_uppercase(),
            quote: quote.to_uppercase(),
        })
    }
}
