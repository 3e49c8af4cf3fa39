use chrono::NaiveDate;
use std::sync::Arc;

use crate::errors::CoreError;
use crate::models::currency::{Currency, CurrencyPair};
use crate::models::job::ExchangeRateJob;
use crate::models::position::PositionRow;
use crate::models::rate::ExchangeRate;

use super::memory::InMemoryStore;

// One typed repository per entity. Services depend only on these traits, so a
// relational backend and the in-memory store are interchangeable.

/// The `currencies` table: reference data seeded from the provider.
pub trait CurrencyRepository: Send + Sync {
    fn list_currencies(&self) -> Result<Vec<Currency>, CoreError>;

    /// Upsert on `code`, all-or-nothing. Returns the number of rows written.
    fn upsert_currencies(&self, currencies: &[Currency]) -> Result<usize, CoreError>;
}

/// The `currency_pairs` table.
pub trait CurrencyPairRepository: Send + Sync {
    /// All pairs, in insertion order.
    fn list_pairs(&self) -> Result<Vec<CurrencyPair>, CoreError>;

    /// Insert a pair. Returns `false` if it was already registered.
    fn insert_pair(&self, pair: &CurrencyPair) -> Result<bool, CoreError>;
}

/// The `exchange_rates` table. Append/upsert only.
pub trait RateRepository: Send + Sync {
    /// All rows dated exactly `date`.
    fn rates_on(&self, date: NaiveDate) -> Result<Vec<ExchangeRate>, CoreError>;

    /// Latest row for `from → to` with `date <= on_or_before`.
    fn latest_rate(
        &self,
        from_currency: &str,
        to_currency: &str,
        on_or_before: NaiveDate,
    ) -> Result<Option<ExchangeRate>, CoreError>;

    /// Upsert keyed on `(from_currency, to_currency, date)`, all-or-nothing.
    fn upsert_rates(&self, rates: &[ExchangeRate]) -> Result<usize, CoreError>;
}

/// The `exchange_rate_jobs` table. Jobs are never deleted.
pub trait JobRepository: Send + Sync {
    fn list_jobs(&self) -> Result<Vec<ExchangeRateJob>, CoreError>;

    fn pending_jobs_for_date(&self, date: NaiveDate) -> Result<Vec<ExchangeRateJob>, CoreError>;

    /// Distinct dates that still have pending jobs, oldest first.
    fn pending_dates(&self) -> Result<Vec<NaiveDate>, CoreError>;

    /// Batch insert, all-or-nothing.
    fn insert_jobs(&self, jobs: &[ExchangeRateJob]) -> Result<(), CoreError>;

    /// Replace jobs by id, all-or-nothing. Unknown ids are an error.
    fn update_jobs(&self, jobs: &[ExchangeRateJob]) -> Result<(), CoreError>;
}

/// The position read model produced by upstream bookkeeping.
pub trait PositionRepository: Send + Sync {
    fn positions_for_owner(&self, owner_id: &str) -> Result<Vec<PositionRow>, CoreError>;
}

/// Per-day provider call counter, used to respect the provider's daily quota.
pub trait ApiUsageRepository: Send + Sync {
    fn calls_on(&self, provider: &str, date: NaiveDate) -> Result<u32, CoreError>;

    /// Increment and return the new count.
    fn record_call(&self, provider: &str, date: NaiveDate) -> Result<u32, CoreError>;
}

/// Bundle of repository handles injected into the services.
#[derive(Clone)]
pub struct Repositories {
    pub currencies: Arc<dyn CurrencyRepository>,
    pub pairs: Arc<dyn CurrencyPairRepository>,
    pub rates: Arc<dyn RateRepository>,
    pub jobs: Arc<dyn JobRepository>,
    pub positions: Arc<dyn PositionRepository>,
    pub usage: Arc<dyn ApiUsageRepository>,
}

impl Repositories {
    /// Every repository backed by the same in-memory store.
    pub fn in_memory(store: Arc<InMemoryStore>) -> Self {
        Self {
            currencies: store.clone(),
            pairs: store.clone(),
            rates: store.clone(),
            jobs: store.clone(),
            positions: store.clone(),
            usage: store,
        }
    }
}
