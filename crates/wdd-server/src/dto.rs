use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use wdd_core::job::FingerprintJob;
use wdd_core::models::{JobSummary, StoredFingerprint};

/// Job status reported while fingerprints for `(url, year)` are still being computed.
pub const STATUS_PENDING: &str = "PENDING";
/// Job status reported once no active job exists for `(url, year)`.
pub const STATUS_COMPLETE: &str = "COMPLETE";
/// Reported by `/calculate-simhash` when a new job was enqueued.
pub const STATUS_STARTED: &str = "started";

pub const CAPTURE_NOT_FOUND: &str = "CAPTURE_NOT_FOUND";
pub const NOT_CAPTURED: &str = "NOT_CAPTURED";

// ---------------------------------------------------------------------------
// Calculate
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct CalculateQuery {
    /// URL whose captures should be fingerprinted
    pub url: Option<String>,
    /// Four-digit capture year
    pub year: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CalculateResponse {
    /// `started` for a new job, `PENDING` if one was already active
    pub status: String,
    pub job_id: Uuid,
}

// ---------------------------------------------------------------------------
// Simhash lookup
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct SimhashQuery {
    pub url: Option<String>,
    /// 14-digit capture timestamp; selects single-capture mode
    pub timestamp: Option<String>,
    /// Capture year; selects per-year listing mode
    pub year: Option<String>,
    /// `1` wraps the listing with a total and job status
    pub compress: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SimhashResponse {
    pub simhash: String,
}

/// `[timestamp, simhash]` pairs, oldest capture first.
pub type CapturePairs = Vec<Vec<String>>;

pub fn capture_pairs(fingerprints: Vec<StoredFingerprint>) -> CapturePairs {
    fingerprints
        .into_iter()
        .map(|f| vec![f.timestamp, f.simhash])
        .collect()
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CompressedCapturesResponse {
    pub captures: CapturePairs,
    pub total: usize,
    /// `PENDING` or `COMPLETE`
    pub status: String,
}

// ---------------------------------------------------------------------------
// Jobs
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct JobQuery {
    pub job_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct JobSummaryResponse {
    pub captures: u32,
    pub stored: u32,
    pub skipped: u32,
    pub failed: u32,
}

impl From<JobSummary> for JobSummaryResponse {
    fn from(s: JobSummary) -> Self {
        Self {
            captures: s.captures,
            stored: s.stored,
            skipped: s.skipped,
            failed: s.failed,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct JobStatusResponse {
    pub status: String,
    pub job_id: Uuid,
    pub url: String,
    pub year: i32,
    /// Terminal error message of a failed job
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
    pub summary: JobSummaryResponse,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<FingerprintJob> for JobStatusResponse {
    fn from(job: FingerprintJob) -> Self {
        Self {
            status: job.status.to_string(),
            job_id: job.id,
            url: job.url,
            year: job.year,
            info: job.error_message,
            summary: job.summary.into(),
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Health & errors
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    /// Always `error`
    pub status: String,
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            error: error.into(),
            message: message.into(),
        }
    }
}
