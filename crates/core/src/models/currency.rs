use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// Category of a tradable unit known to the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurrencyKind {
    /// Fiat currencies (USD, EUR, IDR, ...)
    Currency,
    /// Cryptocurrencies (BTC, ETH, ...)
    Cryptocurrency,
    /// Commodities quoted like currencies (XAU, CC1, ...)
    Commodity,
}

impl std::fmt::Display for CurrencyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CurrencyKind::Currency => write!(f, "currency"),
            CurrencyKind::Cryptocurrency => write!(f, "cryptocurrency"),
            CurrencyKind::Commodity => write!(f, "commodity"),
        }
    }
}

/// An entry of the currency universe, seeded from provider reference data.
///
/// Unique by `code`; re-seeding upserts on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Currency {
    pub code: String,
    pub name: String,
    pub symbol: String,
    pub kind: CurrencyKind,
}

impl Currency {
    pub fn new(code: impl Into<String>, name: impl Into<String>, kind: CurrencyKind) -> Self {
        let code = normalize_code(&code.into());
        Self {
            symbol: code.clone(),
            code,
            name: name.into(),
            kind,
        }
    }
}

/// A quote currency that must be convertible into a base currency for some
/// user position to be valued. One row per ordered pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CurrencyPair {
    pub quote_currency: String,
    pub base_currency: String,
}

impl CurrencyPair {
    /// Build a pair from two codes (uppercased, trimmed).
    /// Fails if either side is empty or both sides are the same currency.
    pub fn new(quote: &str, base: &str) -> Result<Self, CoreError> {
        let quote_currency = normalize_code(quote);
        let base_currency = normalize_code(base);

        if quote_currency.is_empty() || base_currency.is_empty() {
            return Err(CoreError::Validation(format!(
                "Currency pair '{quote}/{base}' has an empty side"
            )));
        }
        if quote_currency == base_currency {
            return Err(CoreError::Validation(format!(
                "Currency pair '{quote_currency}/{base_currency}' converts a currency into itself"
            )));
        }

        Ok(Self {
            quote_currency,
            base_currency,
        })
    }

    /// Provider symbol, e.g. `"USD/IDR"`.
    pub fn symbol(&self) -> String {
        format!("{}/{}", self.quote_currency, self.base_currency)
    }

    /// Parse a provider symbol like `"USD/IDR"`.
    pub fn from_symbol(symbol: &str) -> Result<Self, CoreError> {
        let (quote, base) = symbol.split_once('/').ok_or_else(|| {
            CoreError::Validation(format!("Symbol '{symbol}' is not of the form QUOTE/BASE"))
        })?;
        Self::new(quote, base)
    }
}

impl std::fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.quote_currency, self.base_currency)
    }
}

/// Canonical form of a currency code: trimmed and uppercased.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}
