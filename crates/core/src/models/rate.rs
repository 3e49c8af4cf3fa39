use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::currency::CurrencyPair;

/// Immutable fact: 1 unit of `from_currency` = `rate` units of `to_currency`
/// on `date`.
///
/// The rate is always stored in the pair's declared direction (quote → base),
/// after provider direction normalization. Keyed by
/// `(from_currency, to_currency, date)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRate {
    pub from_currency: String,
    pub to_currency: String,
    pub rate: f64,
    pub date: NaiveDate,
}

/// Upsert key of the rate table.
pub type RateKey = (String, String, NaiveDate);

impl ExchangeRate {
    pub fn new(pair: &CurrencyPair, rate: f64, date: NaiveDate) -> Self {
        Self {
            from_currency: pair.quote_currency.clone(),
            to_currency: pair.base_currency.clone(),
            rate,
            date,
        }
    }

    pub fn key(&self) -> RateKey {
        (self.from_currency.clone(), self.to_currency.clone(), self.date)
    }

    /// Whether this row prices the given pair (date ignored).
    pub fn matches(&self, pair: &CurrencyPair) -> bool {
        self.from_currency == pair.quote_currency && self.to_currency == pair.base_currency
    }
}

/// Outcome of looking up the rate needed to value an amount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RateLookup {
    /// Amount is already in the base currency; no conversion needed.
    SameCurrency,
    /// A conversion is needed but no rate row exists yet.
    Missing,
    /// Rate found (latest row on or before the requested date).
    Found { rate: f64, date: NaiveDate },
}

impl RateLookup {
    pub fn rate(&self) -> Option<f64> {
        match self {
            RateLookup::SameCurrency => Some(1.0),
            RateLookup::Missing => None,
            RateLookup::Found { rate, .. } => Some(*rate),
        }
    }

    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            RateLookup::Found { date, .. } => Some(*date),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, RateLookup::Missing)
    }
}

impl From<Option<ExchangeRate>> for RateLookup {
    fn from(row: Option<ExchangeRate>) -> Self {
        match row {
            Some(r) => RateLookup::Found {
                rate: r.rate,
                date: r.date,
            },
            None => RateLookup::Missing,
        }
    }
}
