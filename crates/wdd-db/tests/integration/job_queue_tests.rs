use std::time::Duration;

use wdd_core::job::JobStatus;
use wdd_core::job_queue::JobQueue;
use wdd_core::models::JobSummary;
use wdd_db::FingerprintJobRepository;

use crate::integration::common::setup_test_db;

const URL: &str = "example.org";

#[tokio::test]
async fn enqueue_creates_pending_job() {
    let (pool, _container) = setup_test_db().await;
    let repo = FingerprintJobRepository::new(pool);

    let enqueued = repo.enqueue(URL, 2020).await.unwrap();

    assert!(enqueued.created);
    assert_eq!(enqueued.job.url, URL);
    assert_eq!(enqueued.job.year, 2020);
    assert_eq!(enqueued.job.status, JobStatus::Pending);
    assert!(enqueued.job.worker_id.is_none());
    assert_eq!(enqueued.job.summary, JobSummary::default());
}

#[tokio::test]
async fn enqueue_deduplicates_active_jobs() {
    let (pool, _container) = setup_test_db().await;
    let repo = FingerprintJobRepository::new(pool);

    let first = repo.enqueue(URL, 2020).await.unwrap();
    let second = repo.enqueue(URL, 2020).await.unwrap();
    let other_year = repo.enqueue(URL, 2021).await.unwrap();

    assert!(first.created);
    assert!(!second.created);
    assert_eq!(second.job.id, first.job.id);
    assert!(other_year.created);
    assert_ne!(other_year.job.id, first.job.id);

    // Still deduplicated while running.
    repo.claim_job("worker-1").await.unwrap();
    let third = repo.enqueue(URL, 2020).await.unwrap();
    assert!(!third.created);
    assert_eq!(third.job.id, first.job.id);
}

#[tokio::test]
async fn concurrent_enqueues_create_one_job() {
    let (pool, _container) = setup_test_db().await;
    let repo = FingerprintJobRepository::new(pool);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let repo = repo.clone();
        handles.push(tokio::spawn(async move { repo.enqueue(URL, 2020).await }));
    }

    let mut ids = Vec::new();
    let mut created = 0;
    for handle in handles {
        let enqueued = handle.await.unwrap().unwrap();
        if enqueued.created {
            created += 1;
        }
        ids.push(enqueued.job.id);
    }

    assert_eq!(created, 1);
    ids.dedup();
    assert_eq!(ids.len(), 1);
}

#[tokio::test]
async fn enqueue_after_terminal_creates_new_job() {
    let (pool, _container) = setup_test_db().await;
    let repo = FingerprintJobRepository::new(pool);

    let first = repo.enqueue(URL, 2020).await.unwrap();
    repo.claim_job("worker-1").await.unwrap();
    repo.complete_job(first.job.id, &JobSummary::default())
        .await
        .unwrap();

    let second = repo.enqueue(URL, 2020).await.unwrap();
    assert!(second.created);
    assert_ne!(second.job.id, first.job.id);
}

#[tokio::test]
async fn claim_job_sets_running_and_worker() {
    let (pool, _container) = setup_test_db().await;
    let repo = FingerprintJobRepository::new(pool);

    repo.enqueue(URL, 2020).await.unwrap();

    let claimed = repo
        .claim_job("worker-1")
        .await
        .unwrap()
        .expect("Should claim the job");

    assert_eq!(claimed.status, JobStatus::Running);
    assert_eq!(claimed.worker_id.as_deref(), Some("worker-1"));
    assert!(claimed.started_at.is_some());

    assert!(repo.claim_job("worker-2").await.unwrap().is_none());
}

#[tokio::test]
async fn claim_job_is_fifo() {
    let (pool, _container) = setup_test_db().await;
    let repo = FingerprintJobRepository::new(pool);

    let first = repo.enqueue("a.example", 2020).await.unwrap();
    repo.enqueue("b.example", 2020).await.unwrap();

    let claimed = repo.claim_job("worker-1").await.unwrap().unwrap();
    assert_eq!(claimed.id, first.job.id);
}

#[tokio::test]
async fn complete_job_stores_summary() {
    let (pool, _container) = setup_test_db().await;
    let repo = FingerprintJobRepository::new(pool);

    let job = repo.enqueue(URL, 2020).await.unwrap().job;
    repo.claim_job("worker-1").await.unwrap();

    let summary = JobSummary {
        captures: 5,
        stored: 3,
        skipped: 1,
        failed: 1,
    };
    repo.complete_job(job.id, &summary).await.unwrap();

    let fetched = repo.get_job(job.id).await.unwrap().unwrap();
    assert_eq!(fetched.status, JobStatus::Completed);
    assert_eq!(fetched.summary, summary);
    assert!(fetched.completed_at.is_some());
    assert!(fetched.worker_id.is_none());
}

#[tokio::test]
async fn fail_job_records_error() {
    let (pool, _container) = setup_test_db().await;
    let repo = FingerprintJobRepository::new(pool);

    let job = repo.enqueue(URL, 2020).await.unwrap().job;
    repo.claim_job("worker-1").await.unwrap();
    repo.fail_job(job.id, "Max errors reached: 10 of 10 allowed capture failures")
        .await
        .unwrap();

    let fetched = repo.get_job(job.id).await.unwrap().unwrap();
    assert_eq!(fetched.status, JobStatus::Failed);
    assert!(
        fetched
            .error_message
            .as_deref()
            .unwrap()
            .starts_with("Max errors reached")
    );
}

#[tokio::test]
async fn cancel_job_only_affects_active_jobs() {
    let (pool, _container) = setup_test_db().await;
    let repo = FingerprintJobRepository::new(pool);

    let job = repo.enqueue(URL, 2020).await.unwrap().job;
    assert!(repo.cancel_job(job.id).await.unwrap());
    assert!(!repo.cancel_job(job.id).await.unwrap());
    assert_eq!(
        repo.get_job(job.id).await.unwrap().unwrap().status,
        JobStatus::Cancelled
    );

    // A cancelled job no longer blocks a fresh enqueue.
    assert!(repo.enqueue(URL, 2020).await.unwrap().created);
}

#[tokio::test]
async fn complete_after_cancel_keeps_cancelled() {
    let (pool, _container) = setup_test_db().await;
    let repo = FingerprintJobRepository::new(pool);

    let job = repo.enqueue(URL, 2020).await.unwrap().job;
    repo.claim_job("worker-1").await.unwrap();
    repo.cancel_job(job.id).await.unwrap();
    repo.complete_job(job.id, &JobSummary::default())
        .await
        .unwrap();

    assert_eq!(
        repo.get_job(job.id).await.unwrap().unwrap().status,
        JobStatus::Cancelled
    );
}

#[tokio::test]
async fn find_active_ignores_terminal_jobs() {
    let (pool, _container) = setup_test_db().await;
    let repo = FingerprintJobRepository::new(pool);

    assert!(repo.find_active(URL, 2020).await.unwrap().is_none());

    let job = repo.enqueue(URL, 2020).await.unwrap().job;
    assert_eq!(
        repo.find_active(URL, 2020).await.unwrap().map(|j| j.id),
        Some(job.id)
    );

    repo.cancel_job(job.id).await.unwrap();
    assert!(repo.find_active(URL, 2020).await.unwrap().is_none());
}

#[tokio::test]
async fn release_worker_jobs_returns_to_pending() {
    let (pool, _container) = setup_test_db().await;
    let repo = FingerprintJobRepository::new(pool);

    repo.enqueue("a.example", 2020).await.unwrap();
    repo.enqueue("b.example", 2020).await.unwrap();
    repo.claim_job("worker-1").await.unwrap();
    repo.claim_job("worker-1").await.unwrap();

    let released = repo.release_worker_jobs("worker-1").await.unwrap();
    assert_eq!(released, 2);

    let pending = repo
        .list_jobs(Some(JobStatus::Pending), 10)
        .await
        .unwrap();
    assert_eq!(pending.len(), 2);
    assert!(pending.iter().all(|j| j.worker_id.is_none()));
}

#[tokio::test]
async fn release_job_returns_single_job() {
    let (pool, _container) = setup_test_db().await;
    let repo = FingerprintJobRepository::new(pool);

    let job = repo.enqueue(URL, 2020).await.unwrap().job;
    repo.claim_job("worker-1").await.unwrap();
    repo.release_job(job.id).await.unwrap();

    let fetched = repo.get_job(job.id).await.unwrap().unwrap();
    assert_eq!(fetched.status, JobStatus::Pending);
    assert!(fetched.started_at.is_none());
}

#[tokio::test]
async fn purge_finished_keeps_active_jobs() {
    let (pool, _container) = setup_test_db().await;
    let repo = FingerprintJobRepository::new(pool);

    let done = repo.enqueue("a.example", 2020).await.unwrap().job;
    repo.cancel_job(done.id).await.unwrap();
    let active = repo.enqueue("b.example", 2020).await.unwrap().job;

    tokio::time::sleep(Duration::from_millis(300)).await;
    let purged = repo
        .purge_finished(Duration::from_millis(100))
        .await
        .unwrap();

    assert_eq!(purged, 1);
    assert!(repo.get_job(done.id).await.unwrap().is_none());
    assert!(repo.get_job(active.id).await.unwrap().is_some());
}
