use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::budget::ErrorBudget;
use crate::config::AppConfig;
use crate::error::AppError;
use crate::models::{CaptureOutcome, FingerprintKey, JobSummary, is_html_content_type};
use crate::simhash;
use crate::traits::{CaptureFetcher, CaptureIndex, FeatureExtractor, FingerprintStore};

/// The subset of [`AppConfig`] the processor needs.
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    pub simhash_size: u32,
    pub simhash_ttl: Duration,
    pub max_errors: u32,
}

impl From<&AppConfig> for ProcessorConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            simhash_size: config.simhash_size,
            simhash_ttl: config.simhash_expire_after,
            max_errors: config.max_errors,
        }
    }
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        ProcessorConfig::from(&AppConfig::default())
    }
}

/// Runs one fingerprinting job: enumerate → skip/fetch → extract → simhash → persist.
///
/// Generic over all external dependencies via traits. Holds no per-job state,
/// so a single instance can serve concurrent jobs.
#[derive(Clone)]
pub struct SnapshotProcessor<I, F, X, S>
where
    I: CaptureIndex,
    F: CaptureFetcher,
    X: FeatureExtractor,
    S: FingerprintStore,
{
    index: I,
    fetcher: F,
    extractor: X,
    store: S,
    config: ProcessorConfig,
}

impl<I, F, X, S> SnapshotProcessor<I, F, X, S>
where
    I: CaptureIndex,
    F: CaptureFetcher,
    X: FeatureExtractor,
    S: FingerprintStore,
{
    pub fn new(index: I, fetcher: F, extractor: X, store: S, config: ProcessorConfig) -> Self {
        Self {
            index,
            fetcher,
            extractor,
            store,
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Fingerprint every capture of `url` during `year`.
    ///
    /// Captures are handled sequentially in index order. Individual capture
    /// failures are charged to a job-local [`ErrorBudget`]; the job aborts with
    /// [`AppError::BudgetExceeded`] once it is spent. Cancellation is checked
    /// before each capture and never interrupts one in progress.
    pub async fn process(
        &self,
        url: &str,
        year: i32,
        cancel: &CancellationToken,
    ) -> Result<JobSummary, AppError> {
        let mut budget = ErrorBudget::new(self.config.max_errors);

        tracing::info!(%url, year, "Listing captures");
        let timestamps = self.index.list_captures(url, year).await?;
        tracing::info!(%url, year, captures = timestamps.len(), "Captures found");

        let mut summary = JobSummary {
            captures: timestamps.len() as u32,
            ..JobSummary::default()
        };

        for timestamp in &timestamps {
            if cancel.is_cancelled() {
                tracing::info!(%url, year, "Cancelled before {}", timestamp);
                return Err(AppError::Cancelled);
            }

            match self.process_capture(url, timestamp).await {
                Ok(CaptureOutcome::Skipped) => {
                    tracing::debug!(%url, %timestamp, "Already fingerprinted, skipping");
                    summary.skipped += 1;
                }
                Ok(CaptureOutcome::Stored(fp)) => {
                    tracing::debug!(%url, %timestamp, simhash = %fp, "Fingerprint stored");
                    summary.stored += 1;
                }
                Err(e) if e.is_job_terminal() => return Err(e),
                Err(e) => {
                    summary.failed += 1;
                    let charged = budget.record_failure();
                    tracing::warn!(
                        %url,
                        %timestamp,
                        error = %e,
                        remaining = budget.remaining(),
                        "Capture failed"
                    );
                    if let Err(exceeded) = charged {
                        tracing::error!(%url, year, error = %exceeded, "Aborting job");
                        return Err(exceeded);
                    }
                }
            }
        }

        tracing::info!(
            %url,
            year,
            stored = summary.stored,
            skipped = summary.skipped,
            failed = summary.failed,
            "Job finished"
        );
        Ok(summary)
    }

    /// Fingerprint a single capture unless one is already stored.
    ///
    /// Persisting is the last step, so an error anywhere leaves no partial
    /// record behind.
    pub async fn process_capture(
        &self,
        url: &str,
        timestamp: &str,
    ) -> Result<CaptureOutcome, AppError> {
        let key = FingerprintKey::new(url, timestamp);
        if self.store.exists(&key).await? {
            return Ok(CaptureOutcome::Skipped);
        }

        let content = self.fetcher.fetch_capture(url, timestamp).await?;
        if !is_html_content_type(&content.content_type) {
            return Err(AppError::BadResponse {
                status: 200,
                content_type: content.content_type,
            });
        }

        let features = self.extractor.extract(&content.body);
        if features.is_empty() {
            return Err(AppError::ExtractionError(format!(
                "no features extracted from {key}"
            )));
        }

        let fp = simhash::fingerprint(&features, self.config.simhash_size);
        self.store
            .set(&key, &fp.encode(), self.config.simhash_ttl)
            .await?;

        Ok(CaptureOutcome::Stored(fp))
    }
}
