use std::future::Future;
use std::time::Duration;

use uuid::Uuid;

use crate::error::AppError;
use crate::job::{Enqueued, FingerprintJob, JobStatus};
use crate::models::JobSummary;

/// Persistent queue of fingerprinting jobs.
///
/// Implementations must make [`enqueue`](Self::enqueue) an atomic
/// set-if-absent on `(url, year)` among active jobs, and must support
/// atomic claiming so that two workers never run the same job.
pub trait JobQueue: Send + Sync + Clone {
    /// Create a pending job unless an active one exists for `(url, year)`,
    /// in which case that job is returned with `created == false`.
    fn enqueue(
        &self,
        url: &str,
        year: i32,
    ) -> impl Future<Output = Result<Enqueued, AppError>> + Send;

    /// Atomically claim the oldest pending job. `None` if the queue is empty.
    fn claim_job(
        &self,
        worker_id: &str,
    ) -> impl Future<Output = Result<Option<FingerprintJob>, AppError>> + Send;

    fn complete_job(
        &self,
        job_id: Uuid,
        summary: &JobSummary,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Mark a job permanently failed with the terminal error text.
    fn fail_job(
        &self,
        job_id: Uuid,
        error: &str,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Cancel a non-terminal job. Returns false if it was already terminal
    /// or does not exist.
    fn cancel_job(&self, job_id: Uuid) -> impl Future<Output = Result<bool, AppError>> + Send;

    fn get_job(
        &self,
        job_id: Uuid,
    ) -> impl Future<Output = Result<Option<FingerprintJob>, AppError>> + Send;

    /// The pending or running job for `(url, year)`, if any.
    fn find_active(
        &self,
        url: &str,
        year: i32,
    ) -> impl Future<Output = Result<Option<FingerprintJob>, AppError>> + Send;

    fn list_jobs(
        &self,
        status: Option<JobStatus>,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<FingerprintJob>, AppError>> + Send;

    /// Return a running job to pending.
    fn release_job(&self, job_id: Uuid) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Release all jobs held by a specific worker (for graceful shutdown).
    fn release_worker_jobs(
        &self,
        worker_id: &str,
    ) -> impl Future<Output = Result<u64, AppError>> + Send;

    /// Delete terminal jobs last updated more than `ttl` ago.
    fn purge_finished(&self, ttl: Duration)
    -> impl Future<Output = Result<u64, AppError>> + Send;
}
