use log::{info, warn};
use std::collections::HashSet;
use std::sync::Arc;

use crate::errors::CoreError;
use crate::models::currency::CurrencyPair;
use crate::models::sync::{FetchOutcome, QueueReport, StopReason};
use crate::storage::traits::JobRepository;

use super::fetch_worker::FetchWorker;

/// Drains the job queue date by date, oldest first.
pub struct QueueRunner {
    jobs: Arc<dyn JobRepository>,
    max_dates_per_run: usize,
}

impl QueueRunner {
    pub fn new(jobs: Arc<dyn JobRepository>, max_dates_per_run: usize) -> Self {
        Self {
            jobs,
            max_dates_per_run,
        }
    }

    /// Run `worker` over each date with pending jobs until the queue is empty,
    /// the worker aborts or the per-run date budget is spent.
    pub async fn run(&self, worker: &FetchWorker) -> Result<QueueReport, CoreError> {
        let mut report = QueueReport {
            dates_processed: Vec::new(),
            rates_updated: 0,
            jobs_completed: 0,
            jobs_failed: 0,
            stop_reason: StopReason::NoMoreJobs,
        };
        let mut visited = HashSet::new();

        loop {
            // Dates already attempted this run keep their skipped jobs pending
            // for the next run.
            let next = self
                .jobs
                .pending_dates()?
                .into_iter()
                .find(|d| !visited.contains(d));
            let Some(date) = next else {
                report.stop_reason = StopReason::NoMoreJobs;
                break;
            };
            if report.dates_processed.len() >= self.max_dates_per_run {
                report.stop_reason = StopReason::BatchLimit;
                break;
            }
            visited.insert(date);

            let mut pairs: Vec<CurrencyPair> = Vec::new();
            for job in self.jobs.pending_jobs_for_date(date)? {
                for pair in job.currency_pairs {
                    if !pairs.contains(&pair) {
                        pairs.push(pair);
                    }
                }
            }

            let fetch = worker.run(date, &pairs).await?;
            report.dates_processed.push(date);
            report.rates_updated += fetch.updated;
            report.jobs_completed += fetch.jobs_completed;
            report.jobs_failed += fetch.jobs_failed;

            let stop = match fetch.outcome {
                FetchOutcome::Completed => None,
                FetchOutcome::RateLimited { .. } => Some(StopReason::RateLimited),
                FetchOutcome::ProviderError { .. } => Some(StopReason::ProviderError),
                FetchOutcome::DailyLimitReached { .. } => Some(StopReason::DailyLimitReached),
            };
            if let Some(reason) = stop {
                warn!("Job queue stopped at {date}: {reason:?}");
                report.stop_reason = reason;
                break;
            }
        }

        info!(
            "Job queue run: {} dates, {} rates updated, {} jobs done, {} failed, stop reason {:?}",
            report.dates_processed.len(),
            report.rates_updated,
            report.jobs_completed,
            report.jobs_failed,
            report.stop_reason
        );
        Ok(report)
    }
}
