use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::AppError;
use crate::job::{FingerprintJob, JobStatus, WorkerConfig};
use crate::job_queue::JobQueue;
use crate::models::JobSummary;
use crate::processor::SnapshotProcessor;
use crate::traits::{CaptureFetcher, CaptureIndex, FeatureExtractor, FingerprintStore};

/// Events emitted by the worker for monitoring/logging.
#[derive(Debug, Clone)]
pub enum WorkerEvent<'a> {
    Started {
        worker_id: &'a str,
    },
    Polling,
    JobClaimed {
        job: &'a FingerprintJob,
    },
    JobCompleted {
        job_id: Uuid,
        summary: &'a JobSummary,
    },
    JobFailed {
        job_id: Uuid,
        error: &'a str,
    },
    JobCancelled {
        job_id: Uuid,
    },
    /// Interrupted by shutdown and handed back to the queue.
    JobReleased {
        job_id: Uuid,
    },
    ShuttingDown {
        worker_id: &'a str,
        jobs_released: u64,
    },
    Stopped {
        worker_id: &'a str,
    },
}

/// Trait for receiving worker events (decoupled logging).
pub trait WorkerReporter: Send + Sync {
    fn report(&self, event: WorkerEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingWorkerReporter;

impl WorkerReporter for TracingWorkerReporter {
    fn report(&self, event: WorkerEvent<'_>) {
        match event {
            WorkerEvent::Started { worker_id } => {
                tracing::info!(%worker_id, "Worker started");
            }
            WorkerEvent::Polling => {
                tracing::debug!("Polling for jobs");
            }
            WorkerEvent::JobClaimed { job } => {
                tracing::info!(job_id = %job.id, task = %job.task_key(), "Job claimed");
            }
            WorkerEvent::JobCompleted { job_id, summary } => {
                tracing::info!(
                    %job_id,
                    stored = summary.stored,
                    skipped = summary.skipped,
                    failed = summary.failed,
                    "Job completed"
                );
            }
            WorkerEvent::JobFailed { job_id, error } => {
                tracing::warn!(%job_id, %error, "Job failed");
            }
            WorkerEvent::JobCancelled { job_id } => {
                tracing::info!(%job_id, "Job cancelled");
            }
            WorkerEvent::JobReleased { job_id } => {
                tracing::info!(%job_id, "Job released back to queue");
            }
            WorkerEvent::ShuttingDown {
                worker_id,
                jobs_released,
            } => {
                tracing::info!(%worker_id, %jobs_released, "Worker shutting down");
            }
            WorkerEvent::Stopped { worker_id } => {
                tracing::info!(%worker_id, "Worker stopped");
            }
        }
    }
}

/// Worker slot that polls the job queue and runs fingerprinting jobs one at a time.
#[derive(Clone)]
pub struct WorkerService<Q, I, F, X, S>
where
    Q: JobQueue,
    I: CaptureIndex,
    F: CaptureFetcher,
    X: FeatureExtractor,
    S: FingerprintStore,
{
    queue: Q,
    processor: SnapshotProcessor<I, F, X, S>,
    config: WorkerConfig,
}

impl<Q, I, F, X, S> WorkerService<Q, I, F, X, S>
where
    Q: JobQueue,
    I: CaptureIndex,
    F: CaptureFetcher,
    X: FeatureExtractor,
    S: FingerprintStore,
{
    pub fn new(queue: Q, processor: SnapshotProcessor<I, F, X, S>, config: WorkerConfig) -> Self {
        Self {
            queue,
            processor,
            config,
        }
    }

    pub fn worker_id(&self) -> &str {
        &self.config.worker_id
    }

    /// Run the worker loop until cancellation.
    pub async fn run<WR: WorkerReporter>(
        &self,
        cancel_token: CancellationToken,
        reporter: &WR,
    ) -> Result<(), AppError> {
        reporter.report(WorkerEvent::Started {
            worker_id: &self.config.worker_id,
        });

        loop {
            if cancel_token.is_cancelled() {
                break;
            }

            reporter.report(WorkerEvent::Polling);

            match self.queue.claim_job(&self.config.worker_id).await {
                Ok(Some(job)) => {
                    reporter.report(WorkerEvent::JobClaimed { job: &job });
                    self.process_job(&job, &cancel_token, reporter).await;
                }
                Ok(None) => {
                    tokio::select! {
                        () = tokio::time::sleep(self.config.poll_interval) => {}
                        () = cancel_token.cancelled() => break,
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to claim job");
                    tokio::select! {
                        () = tokio::time::sleep(self.config.poll_interval * 2) => {}
                        () = cancel_token.cancelled() => break,
                    }
                }
            }
        }

        // Graceful shutdown: release all claimed jobs
        let released = self
            .queue
            .release_worker_jobs(&self.config.worker_id)
            .await
            .unwrap_or(0);

        reporter.report(WorkerEvent::ShuttingDown {
            worker_id: &self.config.worker_id,
            jobs_released: released,
        });
        reporter.report(WorkerEvent::Stopped {
            worker_id: &self.config.worker_id,
        });

        Ok(())
    }

    async fn process_job<WR: WorkerReporter>(
        &self,
        job: &FingerprintJob,
        shutdown: &CancellationToken,
        reporter: &WR,
    ) {
        let job_token = shutdown.child_token();

        let processing = self.processor.process(&job.url, job.year, &job_token);
        tokio::pin!(processing);
        let watcher = watch_cancellation(
            &self.queue,
            job.id,
            &job_token,
            self.config.poll_interval,
        );

        // The watcher only flips the token; the processor always runs to its
        // next cancellation check.
        let result = tokio::select! {
            result = &mut processing => result,
            () = watcher => processing.await,
        };

        match result {
            Ok(summary) => {
                reporter.report(WorkerEvent::JobCompleted {
                    job_id: job.id,
                    summary: &summary,
                });
                if let Err(e) = self.queue.complete_job(job.id, &summary).await {
                    tracing::error!(job_id = %job.id, error = %e, "Failed to mark job completed");
                }
            }
            Err(AppError::Cancelled) if shutdown.is_cancelled() => {
                reporter.report(WorkerEvent::JobReleased { job_id: job.id });
                if let Err(e) = self.queue.release_job(job.id).await {
                    tracing::error!(job_id = %job.id, error = %e, "Failed to release job");
                }
            }
            Err(AppError::Cancelled) => {
                // Already marked cancelled by whoever cancelled it.
                reporter.report(WorkerEvent::JobCancelled { job_id: job.id });
            }
            Err(e) => {
                let error_msg = e.to_string();
                reporter.report(WorkerEvent::JobFailed {
                    job_id: job.id,
                    error: &error_msg,
                });
                if let Err(e) = self.queue.fail_job(job.id, &error_msg).await {
                    tracing::error!(job_id = %job.id, error = %e, "Failed to mark job as failed");
                }
            }
        }
    }
}

impl<Q, I, F, X, S> WorkerService<Q, I, F, X, S>
where
    Q: JobQueue + 'static,
    I: CaptureIndex + 'static,
    F: CaptureFetcher + 'static,
    X: FeatureExtractor + 'static,
    S: FingerprintStore + 'static,
{
    /// Run `slots` workers concurrently until `cancel_token` fires.
    ///
    /// Slot `n` gets the worker id `<worker_id>-<n>`. All slots share the
    /// same queue, clients and store.
    pub async fn run_pool<WR: WorkerReporter + 'static>(
        self,
        slots: usize,
        cancel_token: CancellationToken,
        reporter: Arc<WR>,
    ) -> Result<(), AppError> {
        let mut set = JoinSet::new();
        for slot in 0..slots.max(1) {
            let mut worker = self.clone();
            worker.config = worker
                .config
                .clone()
                .with_worker_id(format!("{}-{slot}", self.config.worker_id));
            let token = cancel_token.clone();
            let reporter = Arc::clone(&reporter);
            set.spawn(async move { worker.run(token, reporter.as_ref()).await });
        }

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::error!(error = %e, "Worker slot exited with error"),
                Err(e) => tracing::error!(error = %e, "Worker slot panicked"),
            }
        }
        Ok(())
    }
}

/// Cancel `token` once the job record shows it was cancelled.
///
/// Returns when the token is cancelled, by this watcher or by shutdown.
async fn watch_cancellation<Q: JobQueue>(
    queue: &Q,
    job_id: Uuid,
    token: &CancellationToken,
    interval: Duration,
) {
    loop {
        tokio::select! {
            () = tokio::time::sleep(interval) => {}
            () = token.cancelled() => return,
        }

        match queue.get_job(job_id).await {
            Ok(Some(job)) if job.status == JobStatus::Cancelled => {
                token.cancel();
                return;
            }
            Ok(_) => {}
            Err(e) => tracing::debug!(%job_id, error = %e, "Cancellation check failed"),
        }
    }
}
