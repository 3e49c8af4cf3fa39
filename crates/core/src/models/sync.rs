use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::currency::CurrencyPair;

/// Pairs that have no exchange rate for `date`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingPairs {
    pub date: NaiveDate,
    pub pairs: Vec<CurrencyPair>,
}

impl PendingPairs {
    pub fn count(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Result of one scheduling call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleReport {
    pub date: NaiveDate,
    pub created: usize,
    /// Unpriced pairs already covered by a pending job.
    pub already_pending: usize,
    /// Pairs that already have a rate on `date`.
    pub already_priced: usize,
}

/// How a fetch run ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FetchOutcome {
    /// The provider answered; rates were persisted.
    Completed,
    /// Provider signalled throttling. Nothing persisted, no job touched.
    RateLimited { message: String },
    /// Any other provider failure, including malformed payloads and
    /// transport errors. Nothing persisted, no job touched.
    ProviderError { message: String },
    /// The configured daily call budget was used up; the provider was not called.
    DailyLimitReached { calls_today: u32, limit: u32 },
}

/// Summary of one fetch-and-upsert run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchReport {
    pub date: NaiveDate,
    pub requested: usize,
    pub updated: usize,
    pub skipped: Vec<CurrencyPair>,
    pub jobs_completed: usize,
    pub jobs_failed: usize,
    pub outcome: FetchOutcome,
}

impl FetchReport {
    pub(crate) fn empty(date: NaiveDate, requested: usize, outcome: FetchOutcome) -> Self {
        Self {
            date,
            requested,
            updated: 0,
            skipped: Vec::new(),
            jobs_completed: 0,
            jobs_failed: 0,
            outcome,
        }
    }

    pub fn aborted(&self) -> bool {
        !matches!(self.outcome, FetchOutcome::Completed)
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }
}

/// Why the queue runner stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    NoMoreJobs,
    RateLimited,
    ProviderError,
    DailyLimitReached,
    BatchLimit,
}

/// Summary of one queue-draining run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueReport {
    pub dates_processed: Vec<NaiveDate>,
    pub rates_updated: usize,
    pub jobs_completed: usize,
    pub jobs_failed: usize,
    pub stop_reason: StopReason,
}
