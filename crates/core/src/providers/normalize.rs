use std::collections::BTreeSet;

use crate::models::currency::normalize_code;

/// Direction in which the provider quotes a currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDirection {
    /// Provider returns base units per quote unit, the stored direction.
    Direct,
    /// Provider returns quote units per base unit; the raw value is inverted.
    Inverted,
}

/// Converts provider rates into the stored quote → base direction.
///
/// Apply exactly once per raw rate: applying twice undoes the inversion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateNormalizer {
    inverted: BTreeSet<String>,
}

impl RateNormalizer {
    pub fn new<I, S>(inverted_currencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            inverted: inverted_currencies
                .into_iter()
                .map(|c| normalize_code(c.as_ref()))
                .collect(),
        }
    }

    pub fn direction(&self, quote_currency: &str) -> RateDirection {
        if self.inverted.contains(&normalize_code(quote_currency)) {
            RateDirection::Inverted
        } else {
            RateDirection::Direct
        }
    }

    pub fn normalize(&self, quote_currency: &str, raw_rate: f64) -> f64 {
        match self.direction(quote_currency) {
            RateDirection::Direct => raw_rate,
            RateDirection::Inverted => 1.0 / raw_rate,
        }
    }
}
