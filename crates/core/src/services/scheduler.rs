use chrono::NaiveDate;
use log::{debug, info};
use std::collections::HashSet;
use std::sync::Arc;

use crate::errors::CoreError;
use crate::models::currency::CurrencyPair;
use crate::models::job::ExchangeRateJob;
use crate::models::sync::ScheduleReport;
use crate::storage::traits::{CurrencyPairRepository, JobRepository, RateRepository};

use super::pending_pairs::PendingPairService;

/// Longest range accepted by `schedule_range`.
pub const MAX_BACKFILL_DAYS: i64 = 366;

/// Queues one pending fetch job per unpriced currency pair and date.
///
/// Only pairs without a rate on the date are queued, and pairs already covered
/// by a pending job are skipped. The check is read-then-insert, so two
/// concurrent callers can still race.
pub struct JobScheduler {
    pending: PendingPairService,
    jobs: Arc<dyn JobRepository>,
    max_retries: u32,
}

impl JobScheduler {
    pub fn new(
        pairs: Arc<dyn CurrencyPairRepository>,
        rates: Arc<dyn RateRepository>,
        jobs: Arc<dyn JobRepository>,
        max_retries: u32,
    ) -> Self {
        Self {
            pending: PendingPairService::new(pairs, rates),
            jobs,
            max_retries,
        }
    }

    pub fn schedule(&self, date: NaiveDate) -> Result<ScheduleReport, CoreError> {
        let (report, new_jobs) = self.plan(date)?;

        if !new_jobs.is_empty() {
            self.jobs.insert_jobs(&new_jobs)?;
        }

        info!(
            "Scheduled {} exchange rate jobs for {date} ({} already pending, {} already priced)",
            report.created, report.already_pending, report.already_priced
        );
        Ok(report)
    }

    /// Backfill every date in `from..=to` that has unpriced pairs. All jobs of
    /// the range go in one insert. Returns one report per date with work.
    pub fn schedule_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ScheduleReport>, CoreError> {
        if from > to {
            return Err(CoreError::Validation(format!(
                "Backfill range starts after it ends ({from} > {to})"
            )));
        }
        let days = (to - from).num_days() + 1;
        if days > MAX_BACKFILL_DAYS {
            return Err(CoreError::Validation(format!(
                "Backfill range of {days} days exceeds {MAX_BACKFILL_DAYS}"
            )));
        }

        let mut reports = Vec::new();
        let mut new_jobs = Vec::new();
        for date in from.iter_days().take(days as usize) {
            let (report, jobs) = self.plan(date)?;
            if report.created + report.already_pending > 0 {
                reports.push(report);
            }
            new_jobs.extend(jobs);
        }

        if !new_jobs.is_empty() {
            self.jobs.insert_jobs(&new_jobs)?;
        }

        info!(
            "Backfilled {} exchange rate jobs over {from}..={to} ({} dates with missing rates)",
            new_jobs.len(),
            reports.len()
        );
        Ok(reports)
    }

    fn plan(&self, date: NaiveDate) -> Result<(ScheduleReport, Vec<ExchangeRateJob>), CoreError> {
        let (missing, registered) = self.pending.pending_with_total(date)?;
        if missing.is_empty() {
            debug!("Nothing to schedule for {date}: {registered} pairs, none missing a rate");
            return Ok((
                ScheduleReport {
                    date,
                    created: 0,
                    already_pending: 0,
                    already_priced: registered,
                },
                Vec::new(),
            ));
        }

        let covered: HashSet<CurrencyPair> = self
            .jobs
            .pending_jobs_for_date(date)?
            .into_iter()
            .flat_map(|job| job.currency_pairs)
            .collect();

        let new_jobs: Vec<ExchangeRateJob> = missing
            .pairs
            .iter()
            .filter(|pair| !covered.contains(*pair))
            .map(|pair| ExchangeRateJob::pending(pair.clone(), date, self.max_retries))
            .collect();

        let report = ScheduleReport {
            date,
            created: new_jobs.len(),
            already_pending: missing.count() - new_jobs.len(),
            already_priced: registered - missing.count(),
        };
        Ok((report, new_jobs))
    }
}
