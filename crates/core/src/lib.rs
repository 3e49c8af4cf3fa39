pub mod errors;
pub mod models;
pub mod providers;
pub mod services;
pub mod storage;

use chrono::{NaiveDate, Utc};
use models::{
    currency::CurrencyPair,
    settings::{Settings, TWELVE_DATA_KEY},
    summary::{GroupBy, SummaryTree},
    sync::{FetchReport, PendingPairs, QueueReport, ScheduleReport},
};
use providers::{
    normalize::RateNormalizer,
    traits::{RateProvider, ReferenceKind},
    twelve_data::TwelveDataProvider,
};
use services::{
    aggregation::AggregationService, fetch_worker::FetchWorker,
    pending_pairs::PendingPairService, queue_runner::QueueRunner,
    reference_sync::ReferenceSyncService, scheduler::JobScheduler,
};
use std::sync::Arc;
use storage::traits::Repositories;

use errors::CoreError;

/// Main entry point for the wealth-ledger core library.
/// Wires the repositories and the rate provider into every service.
#[must_use]
pub struct WealthLedger {
    settings: Settings,
    repos: Repositories,
    pending_pairs: PendingPairService,
    scheduler: JobScheduler,
    fetch_worker: FetchWorker,
    queue_runner: QueueRunner,
    reference_sync: ReferenceSyncService,
    aggregation: AggregationService,
}

impl std::fmt::Debug for WealthLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WealthLedger")
            .field("base_currency", &self.settings.base_currency)
            .field("provider", &self.fetch_worker.provider_name())
            .field("jobs", &self.settings.jobs)
            .finish()
    }
}

impl WealthLedger {
    /// Build the library around explicit repositories and provider.
    pub fn new(
        settings: Settings,
        repos: Repositories,
        provider: Arc<dyn RateProvider>,
    ) -> Result<Self, CoreError> {
        settings.validate()?;

        let normalizer = RateNormalizer::new(&settings.provider.inverted_currencies);

        Ok(Self {
            pending_pairs: PendingPairService::new(repos.pairs.clone(), repos.rates.clone()),
            scheduler: JobScheduler::new(
                repos.pairs.clone(),
                repos.rates.clone(),
                repos.jobs.clone(),
                settings.jobs.max_retries,
            ),
            fetch_worker: FetchWorker::new(
                provider.clone(),
                repos.rates.clone(),
                repos.jobs.clone(),
                repos.usage.clone(),
                normalizer,
                settings.jobs.daily_call_limit,
            ),
            queue_runner: QueueRunner::new(repos.jobs.clone(), settings.jobs.max_dates_per_run),
            reference_sync: ReferenceSyncService::new(
                provider,
                repos.currencies.clone(),
                repos.usage.clone(),
            ),
            aggregation: AggregationService::new(repos.positions.clone(), repos.rates.clone()),
            settings,
            repos,
        })
    }

    /// Build the library with the Twelve Data provider.
    /// Requires the `twelve_data` API key in `settings.api_keys`.
    pub fn with_twelve_data(settings: Settings, repos: Repositories) -> Result<Self, CoreError> {
        let api_key = settings
            .api_key(TWELVE_DATA_KEY)
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                CoreError::Config(format!("Missing API key '{TWELVE_DATA_KEY}' in settings"))
            })?
            .to_string();
        let provider = TwelveDataProvider::new(api_key, &settings.provider);
        Self::new(settings, repos, Arc::new(provider))
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    #[must_use]
    pub fn repositories(&self) -> &Repositories {
        &self.repos
    }

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    // ── Currency Pairs ──────────────────────────────────────────────

    /// Register a pair whose rate must be kept in sync.
    /// Returns `false` if the pair was already registered.
    pub fn register_currency_pair(&self, quote: &str, base: &str) -> Result<bool, CoreError> {
        let pair = CurrencyPair::new(quote, base)?;
        self.repos.pairs.insert_pair(&pair)
    }

    /// Pairs without a rate on `date` (default: today, UTC).
    pub fn get_pending_pairs(&self, date: Option<NaiveDate>) -> Result<PendingPairs, CoreError> {
        self.pending_pairs
            .pending_pairs(date.unwrap_or_else(Self::today))
    }

    // ── Rate Sync ───────────────────────────────────────────────────

    /// Queue one job per unpriced pair not yet covered for `date` (default: today).
    pub fn schedule_jobs(&self, date: Option<NaiveDate>) -> Result<ScheduleReport, CoreError> {
        self.scheduler.schedule(date.unwrap_or_else(Self::today))
    }

    /// Queue jobs for every date in `from..=to` that is missing rates.
    pub fn backfill_jobs(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ScheduleReport>, CoreError> {
        self.scheduler.schedule_range(from, to)
    }

    /// Fetch the pending pairs of `date` (default: today) in one provider call.
    pub async fn run_fetch_worker(&self, date: Option<NaiveDate>) -> Result<FetchReport, CoreError> {
        let pending = self.get_pending_pairs(date)?;
        self.fetch_worker.run(pending.date, &pending.pairs).await
    }

    /// Fetch an explicit set of pairs for `date`.
    pub async fn run_fetch_worker_for(
        &self,
        date: NaiveDate,
        pairs: &[CurrencyPair],
    ) -> Result<FetchReport, CoreError> {
        self.fetch_worker.run(date, pairs).await
    }

    /// Drain pending jobs, oldest date first.
    pub async fn process_job_queue(&self) -> Result<QueueReport, CoreError> {
        self.queue_runner.run(&self.fetch_worker).await
    }

    // ── Reference Data ──────────────────────────────────────────────

    /// Refresh the currency universe from one provider reference list.
    pub async fn sync_reference_data(&self, kind: ReferenceKind) -> Result<usize, CoreError> {
        self.reference_sync.sync(&[kind]).await
    }

    /// Refresh from every reference list (forex, crypto, commodities).
    pub async fn sync_all_reference_data(&self) -> Result<usize, CoreError> {
        self.reference_sync.sync(&ReferenceKind::ALL).await
    }

    // ── Summaries ───────────────────────────────────────────────────

    /// Summary tree of every position of `owner_id` in the configured base
    /// currency, valued as of `as_of` (default: today).
    pub fn get_summary(
        &self,
        owner_id: &str,
        group_by: &GroupBy,
        as_of: Option<NaiveDate>,
    ) -> Result<SummaryTree, CoreError> {
        self.aggregation.summarize(
            owner_id,
            &self.settings.base_currency,
            group_by,
            as_of.unwrap_or_else(Self::today),
        )
    }
}
