use chrono::NaiveDate;
use std::collections::HashSet;
use std::sync::Arc;

use crate::errors::CoreError;
use crate::models::sync::PendingPairs;
use crate::storage::traits::{CurrencyPairRepository, RateRepository};

/// Finds the currency pairs that still lack a rate for a given day.
pub struct PendingPairService {
    pairs: Arc<dyn CurrencyPairRepository>,
    rates: Arc<dyn RateRepository>,
}

impl PendingPairService {
    pub fn new(pairs: Arc<dyn CurrencyPairRepository>, rates: Arc<dyn RateRepository>) -> Self {
        Self { pairs, rates }
    }

    /// Pairs with no `ExchangeRate` row dated exactly `date`, in stored order.
    pub fn pending_pairs(&self, date: NaiveDate) -> Result<PendingPairs, CoreError> {
        Ok(self.pending_with_total(date)?.0)
    }

    /// Pending pairs plus the number of registered pairs they were taken from.
    pub fn pending_with_total(&self, date: NaiveDate) -> Result<(PendingPairs, usize), CoreError> {
        let pairs = self.pairs.list_pairs()?;
        let total = pairs.len();
        if pairs.is_empty() {
            return Ok((
                PendingPairs {
                    date,
                    pairs: Vec::new(),
                },
                0,
            ));
        }

        let priced: HashSet<(String, String)> = self
            .rates
            .rates_on(date)?
            .into_iter()
            .map(|r| (r.from_currency, r.to_currency))
            .collect();

        let pairs = pairs
            .into_iter()
            .filter(|p| !priced.contains(&(p.quote_currency.clone(), p.base_currency.clone())))
            .collect();

        Ok((PendingPairs { date, pairs }, total))
    }
}
