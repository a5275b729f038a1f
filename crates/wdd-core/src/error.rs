use thiserror::Error;

/// Application-wide error types for wayback-discover-diff.
#[derive(Error, Debug)]
pub enum AppError {
    /// The capture index returned no data rows for the requested year.
    #[error("No snapshots found for {url} in {year}")]
    NoSnapshots { url: String, year: i32 },

    /// Transport-level failure talking to the index or replay service.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Request timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Non-200 status or a non-HTML content type on a capture fetch.
    #[error("Bad response (HTTP {status}, content-type {content_type:?})")]
    BadResponse { status: u16, content_type: String },

    /// Feature extraction yielded no tokens.
    #[error("Extraction error: {0}")]
    ExtractionError(String),

    /// Persistence store operation failed.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Accumulated capture failures reached the configured maximum.
    #[error("Max errors reached: {failures} of {max_errors} allowed capture failures")]
    BudgetExceeded { failures: u32, max_errors: u32 },

    /// The job's cancellation signal was observed between captures.
    #[error("Job cancelled")]
    Cancelled,

    /// Malformed fingerprint encoding.
    #[error("Decode error: {0}")]
    DecodeError(String),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Caller supplied an unusable argument (bad URL, bad timestamp, ...).
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl AppError {
    /// Returns true if this error ends the whole job. Any other error raised
    /// while handling a capture is charged to the job's error budget.
    pub fn is_job_terminal(&self) -> bool {
        matches!(
            self,
            AppError::NoSnapshots { .. } | AppError::BudgetExceeded { .. } | AppError::Cancelled
        )
    }
}
