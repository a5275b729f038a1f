use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::simhash::Fingerprint;

/// Normalized token → occurrence count.
pub type FeatureMap = HashMap<String, u32>;

/// Raw body of one archived capture plus its declared content type.
#[derive(Debug, Clone)]
pub struct CaptureContent {
    pub body: Vec<u8>,
    pub content_type: String,
}

impl CaptureContent {
    pub fn html(body: impl Into<Vec<u8>>) -> Self {
        Self {
            body: body.into(),
            content_type: "text/html; charset=utf-8".to_string(),
        }
    }
}

/// Logical key of a persisted fingerprint.
///
/// Renders as `simhash:<url>:<timestamp>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FingerprintKey {
    pub url: String,
    pub timestamp: String,
}

impl FingerprintKey {
    pub fn new(url: impl Into<String>, timestamp: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timestamp: timestamp.into(),
        }
    }

    /// Prefix shared by every key of `url`.
    pub fn url_prefix(url: &str) -> String {
        format!("simhash:{url}:")
    }
}

impl fmt::Display for FingerprintKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "simhash:{}:{}", self.url, self.timestamp)
    }
}

/// A persisted fingerprint as listed for a URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFingerprint {
    pub timestamp: String,
    /// Base64 encoding as written by the processor.
    pub simhash: String,
}

impl StoredFingerprint {
    pub fn fingerprint(&self) -> Result<Fingerprint, AppError> {
        Fingerprint::decode(&self.simhash)
    }

    /// True if the capture was taken during `year`.
    pub fn in_year(&self, year: i32) -> bool {
        self.timestamp.starts_with(&format!("{year:04}"))
    }
}

/// What happened to a single capture inside a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// A fingerprint already existed; nothing was fetched.
    Skipped,
    /// Fetched, fingerprinted and persisted.
    Stored(Fingerprint),
}

/// Counters reported when a job finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSummary {
    pub captures: u32,
    pub stored: u32,
    pub skipped: u32,
    pub failed: u32,
}

/// HTML-family content types accepted on capture fetches.
pub fn is_html_content_type(content_type: &str) -> bool {
    let lower = content_type.to_ascii_lowercase();
    lower.contains("text/html") || lower.contains("application/xhtml")
}

/// Validate a 14-digit `YYYYMMDDHHMMSS` capture timestamp.
pub fn validate_timestamp(timestamp: &str) -> Result<(), AppError> {
    if timestamp.len() == 14 && timestamp.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(AppError::InvalidInput(format!(
            "capture timestamp must be 14 digits, got {timestamp:?}"
        )))
    }
}
