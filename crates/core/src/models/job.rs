use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::currency::CurrencyPair;
use crate::errors::CoreError;

/// Lifecycle state of an exchange-rate job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Done,
    Failed,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Done => write!(f, "done"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Unit of synchronization work: fetch the rate(s) of `currency_pairs` on `date`.
///
/// Jobs are never deleted. They serve as an audit trail and as the
/// de-duplication anchor for the scheduler. `currency_pairs` holds exactly one
/// pair for jobs created by the scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRateJob {
    pub id: Uuid,
    pub date: NaiveDate,
    pub currency_pairs: Vec<CurrencyPair>,
    pub status: JobStatus,
    pub retry_count: u32,
    pub max_retries: u32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl ExchangeRateJob {
    /// A fresh pending job for a single pair.
    pub fn pending(pair: CurrencyPair, date: NaiveDate, max_retries: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            date,
            currency_pairs: vec![pair],
            status: JobStatus::Pending,
            retry_count: 0,
            max_retries,
            last_error: None,
            created_at: Utc::now(),
            processed_at: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == JobStatus::Pending
    }

    pub fn covers(&self, pair: &CurrencyPair) -> bool {
        self.currency_pairs.contains(pair)
    }

    /// `pending → done`.
    pub fn mark_done(&mut self) -> Result<(), CoreError> {
        self.ensure_pending("done")?;
        self.status = JobStatus::Done;
        self.last_error = None;
        self.processed_at = Some(Utc::now());
        Ok(())
    }

    /// Record a retryable failure: `retry_count += 1`, and promote to
    /// `failed` once `retry_count` exceeds `max_retries`.
    ///
    /// Returns the resulting status.
    pub fn record_failure(&mut self, reason: impl Into<String>) -> Result<JobStatus, CoreError> {
        self.ensure_pending("retried")?;
        self.retry_count += 1;
        self.last_error = Some(reason.into());
        if self.retry_count > self.max_retries {
            self.status = JobStatus::Failed;
            self.processed_at = Some(Utc::now());
        }
        Ok(self.status)
    }

    fn ensure_pending(&self, target: &str) -> Result<(), CoreError> {
        if self.status != JobStatus::Pending {
            return Err(CoreError::Validation(format!(
                "Job {} is {} and cannot be {target}",
                self.id, self.status
            )));
        }
        Ok(())
    }
}
