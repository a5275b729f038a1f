use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::JobSummary;

/// Lifecycle of a fingerprinting job.
///
/// `Pending` and `Running` are active; the rest are terminal and never change
/// again. A failed job is not retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub const ALL: [JobStatus; 5] = [
        JobStatus::Pending,
        JobStatus::Running,
        JobStatus::Completed,
        JobStatus::Failed,
        JobStatus::Cancelled,
    ];

    /// Name stored in the `status` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }

    /// Pending or running; at most one such job exists per `(url, year)`.
    pub fn is_active(&self) -> bool {
        matches!(self, JobStatus::Pending | JobStatus::Running)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AppError::InvalidInput(format!("unknown job status {s:?}")))
    }
}

/// A request to fingerprint every capture of `url` during `year`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FingerprintJob {
    pub id: Uuid,
    pub url: String,
    pub year: i32,
    pub status: JobStatus,
    /// Worker slot currently running the job.
    pub worker_id: Option<String>,
    /// Terminal error text of a failed job, verbatim.
    pub error_message: Option<String>,
    pub summary: JobSummary,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl FingerprintJob {
    /// Dedup key used by the dispatch layer: `task:<url>:<year>`.
    pub fn task_key(&self) -> String {
        task_key(&self.url, self.year)
    }
}

pub fn task_key(url: &str, year: i32) -> String {
    format!("task:{url}:{year}")
}

/// Outcome of [`JobQueue::enqueue`](crate::job_queue::JobQueue::enqueue).
#[derive(Debug, Clone)]
pub struct Enqueued {
    pub job: FingerprintJob,
    /// False when an active job for the same `(url, year)` already existed.
    pub created: bool,
}

/// Identity and polling cadence of one worker slot.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub worker_id: String,
    /// Idle delay between queue polls; also the cancellation check period
    /// of a running job.
    pub poll_interval: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        let id = Uuid::new_v4().simple().to_string();
        Self {
            worker_id: format!("wdd-{}", &id[..8]),
            poll_interval: Duration::from_secs(2),
        }
    }
}

impl WorkerConfig {
    pub fn with_worker_id(self, worker_id: impl Into<String>) -> Self {
        Self {
            worker_id: worker_id.into(),
            ..self
        }
    }

    pub fn with_poll_interval(self, poll_interval: Duration) -> Self {
        Self {
            poll_interval,
            ..self
        }
    }
}
