use std::future::Future;
use std::time::Duration;

use crate::error::AppError;
use crate::models::{CaptureContent, FeatureMap, FingerprintKey, StoredFingerprint};

/// Lists historical capture timestamps of a URL.
pub trait CaptureIndex: Send + Sync + Clone {
    /// Timestamps captured during `year`, in the order the index returns them.
    ///
    /// Returns [`AppError::NoSnapshots`] when the index has no data rows.
    fn list_captures(
        &self,
        url: &str,
        year: i32,
    ) -> impl Future<Output = Result<Vec<String>, AppError>> + Send;
}

/// Downloads the archived body of one capture.
pub trait CaptureFetcher: Send + Sync + Clone {
    fn fetch_capture(
        &self,
        url: &str,
        timestamp: &str,
    ) -> impl Future<Output = Result<CaptureContent, AppError>> + Send;
}

/// Turns raw markup into a weighted token multiset.
///
/// Unparseable input yields an empty map rather than an error.
pub trait FeatureExtractor: Send + Sync + Clone {
    fn extract(&self, markup: &[u8]) -> FeatureMap;
}

/// Key-value persistence of encoded fingerprints with per-entry expiry.
pub trait FingerprintStore: Send + Sync + Clone {
    fn exists(&self, key: &FingerprintKey) -> impl Future<Output = Result<bool, AppError>> + Send;

    fn get(
        &self,
        key: &FingerprintKey,
    ) -> impl Future<Output = Result<Option<String>, AppError>> + Send;

    /// Write `simhash` under `key`, expiring after `ttl`. An existing live
    /// fingerprint is left untouched; an expired one is replaced.
    fn set(
        &self,
        key: &FingerprintKey,
        simhash: &str,
        ttl: Duration,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    /// All live fingerprints of `url`, oldest capture first.
    fn list_for_url(
        &self,
        url: &str,
    ) -> impl Future<Output = Result<Vec<StoredFingerprint>, AppError>> + Send;

    /// Drop expired entries. Returns how many were removed, when known.
    fn purge_expired(&self) -> impl Future<Output = Result<u64, AppError>> + Send;
}
