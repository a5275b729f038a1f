use std::time::Duration;

use tokio_util::sync::CancellationToken;
use wdd_core::job_queue::JobQueue;
use wdd_core::traits::FingerprintStore;

/// Removes expired fingerprints and finished jobs older than `job_ttl`.
///
/// Errors are logged and never stop the loop.
pub async fn purge_once<S: FingerprintStore, Q: JobQueue>(store: &S, queue: &Q, job_ttl: Duration) {
    match store.purge_expired().await {
        Ok(0) => {}
        Ok(purged) => tracing::info!(purged, "Expired fingerprints removed"),
        Err(e) => tracing::warn!(error = %e, "Fingerprint purge failed"),
    }
    match queue.purge_finished(job_ttl).await {
        Ok(0) => {}
        Ok(purged) => tracing::info!(purged, "Finished jobs removed"),
        Err(e) => tracing::warn!(error = %e, "Job purge failed"),
    }
}

/// Run [`purge_once`] every `interval` until `cancel` fires.
pub async fn run_purge_loop<S: FingerprintStore, Q: JobQueue>(
    store: S,
    queue: Q,
    job_ttl: Duration,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = ticker.tick() => purge_once(&store, &queue, job_ttl).await,
            () = cancel.cancelled() => break,
        }
    }
    tracing::debug!("Purge loop stopped");
}
