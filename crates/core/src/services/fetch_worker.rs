use chrono::{NaiveDate, Utc};
use log::{error, info, warn};
use std::collections::HashSet;
use std::sync::Arc;

use crate::errors::CoreError;
use crate::models::currency::CurrencyPair;
use crate::models::job::{ExchangeRateJob, JobStatus};
use crate::models::rate::ExchangeRate;
use crate::models::sync::{FetchOutcome, FetchReport};
use crate::providers::normalize::RateNormalizer;
use crate::providers::response::parse_exchange_rates;
use crate::providers::traits::RateProvider;
use crate::storage::traits::{ApiUsageRepository, JobRepository, RateRepository};

/// One fetch-and-upsert pass against the pricing provider.
///
/// Provider failures end the run with an aborted report; nothing is written
/// and no job changes. Only store failures come back as `Err`.
pub struct FetchWorker {
    provider: Arc<dyn RateProvider>,
    rates: Arc<dyn RateRepository>,
    jobs: Arc<dyn JobRepository>,
    usage: Arc<dyn ApiUsageRepository>,
    normalizer: RateNormalizer,
    daily_call_limit: Option<u32>,
}

impl FetchWorker {
    pub fn new(
        provider: Arc<dyn RateProvider>,
        rates: Arc<dyn RateRepository>,
        jobs: Arc<dyn JobRepository>,
        usage: Arc<dyn ApiUsageRepository>,
        normalizer: RateNormalizer,
        daily_call_limit: Option<u32>,
    ) -> Self {
        Self {
            provider,
            rates,
            jobs,
            usage,
            normalizer,
            daily_call_limit,
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Fetch the rates of `pairs` on `date` in a single provider call.
    pub async fn run(&self, date: NaiveDate, pairs: &[CurrencyPair]) -> Result<FetchReport, CoreError> {
        if pairs.is_empty() {
            return Ok(FetchReport::empty(date, 0, FetchOutcome::Completed));
        }

        let provider = self.provider.name().to_string();
        let today = Utc::now().date_naive();

        if let Some(limit) = self.daily_call_limit {
            let calls_today = self.usage.calls_on(&provider, today)?;
            if calls_today >= limit {
                warn!("Daily {provider} call limit reached ({calls_today}/{limit}); skipping {date}");
                return Ok(FetchReport::empty(
                    date,
                    pairs.len(),
                    FetchOutcome::DailyLimitReached { calls_today, limit },
                ));
            }
        }

        let symbols: Vec<String> = pairs.iter().map(CurrencyPair::symbol).collect();
        self.usage.record_call(&provider, today)?;

        let parsed = match self.provider.fetch_exchange_rates(&symbols, date).await {
            Ok(response) => parse_exchange_rates(&provider, &response, pairs),
            Err(e) => Err(e),
        };

        let parsed = match parsed {
            Ok(parsed) => parsed,
            Err(e) if e.is_provider_failure() => {
                let outcome = match &e {
                    CoreError::ProviderRateLimited { message, .. } => {
                        warn!("{provider} rate limited the request for {} on {date}: {message}", symbols.join(","));
                        FetchOutcome::RateLimited {
                            message: message.clone(),
                        }
                    }
                    other => {
                        error!("{provider} failed for {} on {date}: {other}", symbols.join(","));
                        FetchOutcome::ProviderError {
                            message: other.to_string(),
                        }
                    }
                };
                return Ok(FetchReport::empty(date, pairs.len(), outcome));
            }
            Err(e) => return Err(e),
        };

        for pair in &parsed.missing {
            warn!("{provider} returned no usable rate for {pair} on {date}; skipping");
        }

        let rows: Vec<ExchangeRate> = parsed
            .found
            .iter()
            .map(|(pair, raw)| {
                ExchangeRate::new(pair, self.normalizer.normalize(&pair.quote_currency, *raw), date)
            })
            .collect();

        let updated = if rows.is_empty() {
            0
        } else {
            self.rates.upsert_rates(&rows)?
        };

        let resolved: HashSet<&CurrencyPair> = parsed.found.iter().map(|(p, _)| p).collect();
        let skipped: HashSet<&CurrencyPair> = parsed.missing.iter().collect();
        let (jobs_completed, jobs_failed) = self.settle_jobs(date, &resolved, &skipped)?;

        info!(
            "Fetched {updated}/{} rates for {date} ({} skipped, {jobs_completed} jobs done, {jobs_failed} failed)",
            pairs.len(),
            parsed.missing.len()
        );

        Ok(FetchReport {
            date,
            requested: pairs.len(),
            updated,
            skipped: parsed.missing,
            jobs_completed,
            jobs_failed,
            outcome: FetchOutcome::Completed,
        })
    }

    /// Move the pending jobs of `date` forward after a successful upsert.
    fn settle_jobs(
        &self,
        date: NaiveDate,
        resolved: &HashSet<&CurrencyPair>,
        skipped: &HashSet<&CurrencyPair>,
    ) -> Result<(usize, usize), CoreError> {
        let mut changed: Vec<ExchangeRateJob> = Vec::new();
        let mut completed = 0;
        let mut failed = 0;

        for mut job in self.jobs.pending_jobs_for_date(date)? {
            if job.currency_pairs.is_empty() {
                continue;
            }
            if job.currency_pairs.iter().all(|p| resolved.contains(p)) {
                job.mark_done()?;
                completed += 1;
                changed.push(job);
            } else if let Some(pair) = job.currency_pairs.iter().find(|p| skipped.contains(p)).cloned() {
                let status = job.record_failure(format!("no rate returned for {pair}"))?;
                if status == JobStatus::Failed {
                    warn!(
                        "Job {} for {pair} on {date} failed after {} retries",
                        job.id, job.retry_count
                    );
                    failed += 1;
                }
                changed.push(job);
            }
        }

        if !changed.is_empty() {
            self.jobs.update_jobs(&changed)?;
        }
        Ok((completed, failed))
    }
}
