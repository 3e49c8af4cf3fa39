use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use crate::errors::CoreError;
use crate::models::currency::{Currency, CurrencyPair};
use crate::models::job::{ExchangeRateJob, JobStatus};
use crate::models::position::PositionRow;
use crate::models::rate::{ExchangeRate, RateKey};

use super::traits::{
    ApiUsageRepository, CurrencyPairRepository, CurrencyRepository, JobRepository,
    PositionRepository, RateRepository,
};

/// In-process implementation of every repository.
///
/// Each table sits behind its own `Mutex`; batch writes validate first and
/// apply under a single lock, so they are all-or-nothing. Use
/// `snapshot()` + `StorageManager` to make the contents durable.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    currencies: Mutex<Vec<Currency>>,
    pairs: Mutex<Vec<CurrencyPair>>,
    rates: Mutex<BTreeMap<RateKey, ExchangeRate>>,
    jobs: Mutex<Vec<ExchangeRateJob>>,
    positions: Mutex<Vec<PositionRow>>,
    usage: Mutex<HashMap<(String, NaiveDate), u32>>,
}

/// Serializable copy of the whole store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub currencies: Vec<Currency>,
    pub pairs: Vec<CurrencyPair>,
    pub rates: Vec<ExchangeRate>,
    pub jobs: Vec<ExchangeRateJob>,
    pub positions: Vec<PositionRow>,
    pub usage: Vec<ApiUsage>,
}

/// One row of the provider call counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiUsage {
    pub provider: String,
    pub date: NaiveDate,
    pub calls: u32,
}

fn lock<'a, T>(table: &'a Mutex<T>, name: &str) -> Result<MutexGuard<'a, T>, CoreError> {
    table
        .lock()
        .map_err(|_| CoreError::Persistence(format!("table '{name}' is poisoned")))
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from a snapshot (e.g., loaded from disk).
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        let rates = snapshot.rates.into_iter().map(|r| (r.key(), r)).collect();
        let usage = snapshot
            .usage
            .into_iter()
            .map(|u| ((u.provider, u.date), u.calls))
            .collect();
        Self {
            currencies: Mutex::new(snapshot.currencies),
            pairs: Mutex::new(snapshot.pairs),
            rates: Mutex::new(rates),
            jobs: Mutex::new(snapshot.jobs),
            positions: Mutex::new(snapshot.positions),
            usage: Mutex::new(usage),
        }
    }

    /// Copy the current contents of every table.
    pub fn snapshot(&self) -> Result<StoreSnapshot, CoreError> {
        let mut usage: Vec<ApiUsage> = lock(&self.usage, "api_usage")?
            .iter()
            .map(|((provider, date), calls)| ApiUsage {
                provider: provider.clone(),
                date: *date,
                calls: *calls,
            })
            .collect();
        usage.sort_by(|a, b| (a.date, &a.provider).cmp(&(b.date, &b.provider)));

        Ok(StoreSnapshot {
            currencies: lock(&self.currencies, "currencies")?.clone(),
            pairs: lock(&self.pairs, "currency_pairs")?.clone(),
            rates: lock(&self.rates, "exchange_rates")?.values().cloned().collect(),
            jobs: lock(&self.jobs, "exchange_rate_jobs")?.clone(),
            positions: lock(&self.positions, "positions")?.clone(),
            usage,
        })
    }

    /// Replace the position read model (fed by upstream bookkeeping).
    pub fn set_positions(&self, rows: Vec<PositionRow>) -> Result<(), CoreError> {
        *lock(&self.positions, "positions")? = rows;
        Ok(())
    }

    pub fn rate_count(&self) -> Result<usize, CoreError> {
        Ok(lock(&self.rates, "exchange_rates")?.len())
    }
}

impl CurrencyRepository for InMemoryStore {
    fn list_currencies(&self) -> Result<Vec<Currency>, CoreError> {
        Ok(lock(&self.currencies, "currencies")?.clone())
    }

    fn upsert_currencies(&self, currencies: &[Currency]) -> Result<usize, CoreError> {
        let mut table = lock(&self.currencies, "currencies")?;
        for currency in currencies {
            match table.iter_mut().find(|c| c.code == currency.code) {
                Some(existing) => *existing = currency.clone(),
                None => table.push(currency.clone()),
            }
        }
        Ok(currencies.len())
    }
}

impl CurrencyPairRepository for InMemoryStore {
    fn list_pairs(&self) -> Result<Vec<CurrencyPair>, CoreError> {
        Ok(lock(&self.pairs, "currency_pairs")?.clone())
    }

    fn insert_pair(&self, pair: &CurrencyPair) -> Result<bool, CoreError> {
        let mut table = lock(&self.pairs, "currency_pairs")?;
        if table.contains(pair) {
            return Ok(false);
        }
        table.push(pair.clone());
        Ok(true)
    }
}

impl RateRepository for InMemoryStore {
    fn rates_on(&self, date: NaiveDate) -> Result<Vec<ExchangeRate>, CoreError> {
        Ok(lock(&self.rates, "exchange_rates")?
            .values()
            .filter(|r| r.date == date)
            .cloned()
            .collect())
    }

    fn latest_rate(
        &self,
        from_currency: &str,
        to_currency: &str,
        on_or_before: NaiveDate,
    ) -> Result<Option<ExchangeRate>, CoreError> {
        let table = lock(&self.rates, "exchange_rates")?;
        let lo = (from_currency.to_string(), to_currency.to_string(), NaiveDate::MIN);
        let hi = (from_currency.to_string(), to_currency.to_string(), on_or_before);
        Ok(table.range(lo..=hi).next_back().map(|(_, r)| r.clone()))
    }

    fn upsert_rates(&self, rates: &[ExchangeRate]) -> Result<usize, CoreError> {
        if let Some(bad) = rates.iter().find(|r| !r.rate.is_finite() || r.rate <= 0.0) {
            return Err(CoreError::Persistence(format!(
                "refusing to store rate {} for {}/{} on {}",
                bad.rate, bad.from_currency, bad.to_currency, bad.date
            )));
        }
        let mut table = lock(&self.rates, "exchange_rates")?;
        for rate in rates {
            table.insert(rate.key(), rate.clone());
        }
        Ok(rates.len())
    }
}

impl JobRepository for InMemoryStore {
    fn list_jobs(&self) -> Result<Vec<ExchangeRateJob>, CoreError> {
        Ok(lock(&self.jobs, "exchange_rate_jobs")?.clone())
    }

    fn pending_jobs_for_date(&self, date: NaiveDate) -> Result<Vec<ExchangeRateJob>, CoreError> {
        Ok(lock(&self.jobs, "exchange_rate_jobs")?
            .iter()
            .filter(|j| j.date == date && j.status == JobStatus::Pending)
            .cloned()
            .collect())
    }

    fn pending_dates(&self) -> Result<Vec<NaiveDate>, CoreError> {
        let mut dates: Vec<NaiveDate> = lock(&self.jobs, "exchange_rate_jobs")?
            .iter()
            .filter(|j| j.status == JobStatus::Pending)
            .map(|j| j.date)
            .collect();
        dates.sort();
        dates.dedup();
        Ok(dates)
    }

    fn insert_jobs(&self, jobs: &[ExchangeRateJob]) -> Result<(), CoreError> {
        let mut table = lock(&self.jobs, "exchange_rate_jobs")?;
        if let Some(dup) = jobs.iter().find(|j| table.iter().any(|t| t.id == j.id)) {
            return Err(CoreError::Persistence(format!("job {} already exists", dup.id)));
        }
        table.extend_from_slice(jobs);
        Ok(())
    }

    fn update_jobs(&self, jobs: &[ExchangeRateJob]) -> Result<(), CoreError> {
        let mut table = lock(&self.jobs, "exchange_rate_jobs")?;

        // Resolve every index before touching anything.
        let mut slots = Vec::with_capacity(jobs.len());
        for job in jobs {
            let idx = table
                .iter()
                .position(|t| t.id == job.id)
                .ok_or_else(|| CoreError::Persistence(format!("job {} not found", job.id)))?;
            slots.push(idx);
        }

        for (idx, job) in slots.into_iter().zip(jobs) {
            table[idx] = job.clone();
        }
        Ok(())
    }
}

impl PositionRepository for InMemoryStore {
    fn positions_for_owner(&self, owner_id: &str) -> Result<Vec<PositionRow>, CoreError> {
        Ok(lock(&self.positions, "positions")?
            .iter()
            .filter(|p| p.owner_id == owner_id)
            .cloned()
            .collect())
    }
}

impl ApiUsageRepository for InMemoryStore {
    fn calls_on(&self, provider: &str, date: NaiveDate) -> Result<u32, CoreError> {
        Ok(lock(&self.usage, "api_usage")?
            .get(&(provider.to_string(), date))
            .copied()
            .unwrap_or(0))
    }

    fn record_call(&self, provider: &str, date: NaiveDate) -> Result<u32, CoreError> {
        let mut table = lock(&self.usage, "api_usage")?;
        let count = table.entry((provider.to_string(), date)).or_insert(0);
        *count += 1;
        Ok(*count)
    }
}
