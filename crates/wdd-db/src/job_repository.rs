use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use wdd_core::error::AppError;
use wdd_core::job::{Enqueued, FingerprintJob, JobStatus};
use wdd_core::job_queue::JobQueue;
use wdd_core::models::JobSummary;

use crate::db_error;

/// Attempts before giving up on an enqueue that keeps racing a concurrent one.
const ENQUEUE_ATTEMPTS: u32 = 3;

/// PostgreSQL-backed job queue using `SELECT FOR UPDATE SKIP LOCKED`.
///
/// The partial unique index on `(url, year)` over pending/running rows makes
/// enqueue an atomic set-if-absent.
#[derive(Clone)]
pub struct FingerprintJobRepository {
    pool: PgPool,
}

impl FingerprintJobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// -- Internal row types for sqlx deserialization --

#[derive(sqlx::FromRow)]
struct JobRow {
    id: Uuid,
    url: String,
    year: i32,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    error_message: Option<String>,
    worker_id: Option<String>,
    captures: i32,
    stored: i32,
    skipped: i32,
    failed: i32,
}

#[derive(sqlx::FromRow)]
struct EnqueueRow {
    #[sqlx(flatten)]
    job: JobRow,
    created: bool,
}

impl From<JobRow> for FingerprintJob {
    fn from(row: JobRow) -> Self {
        FingerprintJob {
            id: row.id,
            url: row.url,
            year: row.year,
            status: row.status.parse().unwrap_or(JobStatus::Pending),
            created_at: row.created_at,
            updated_at: row.updated_at,
            started_at: row.started_at,
            completed_at: row.completed_at,
            error_message: row.error_message,
            worker_id: row.worker_id,
            summary: JobSummary {
                captures: row.captures as u32,
                stored: row.stored as u32,
                skipped: row.skipped as u32,
                failed: row.failed as u32,
            },
        }
    }
}

impl JobQueue for FingerprintJobRepository {
    async fn enqueue(&self, url: &str, year: i32) -> Result<Enqueued, AppError> {
        for _ in 0..ENQUEUE_ATTEMPTS {
            // Either the insert wins, or the existing active row is returned.
            // Both come up empty only when a concurrent enqueue committed after
            // this statement's snapshot was taken; retrying then sees its row.
            let row = sqlx::query_as::<_, EnqueueRow>(
                r#"
                WITH inserted AS (
                    INSERT INTO fingerprint_jobs (url, year)
                    VALUES ($1, $2)
                    ON CONFLICT (url, year) WHERE status IN ('pending', 'running') DO NOTHING
                    RETURNING *
                )
                SELECT *, TRUE AS created FROM inserted
                UNION ALL
                SELECT *, FALSE AS created FROM fingerprint_jobs
                WHERE url = $1 AND year = $2 AND status IN ('pending', 'running')
                  AND NOT EXISTS (SELECT 1 FROM inserted)
                LIMIT 1
                "#,
            )
            .bind(url)
            .bind(year)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

            if let Some(row) = row {
                return Ok(Enqueued {
                    job: row.job.into(),
                    created: row.created,
                });
            }
        }

        Err(AppError::DatabaseError(format!(
            "Could not enqueue or find active job for {url} ({year})"
        )))
    }

    async fn claim_job(&self, worker_id: &str) -> Result<Option<FingerprintJob>, AppError> {
        let row = sqlx::query_as::<_, JobRow>(
            r#"
            UPDATE fingerprint_jobs
            SET status = 'running', worker_id = $1, started_at = NOW(), updated_at = NOW()
            WHERE id = (
                SELECT id FROM fingerprint_jobs
                WHERE status = 'pending'
                ORDER BY created_at ASC
                FOR UPDATE SKIP LOCKED
                LIMIT 1
            )
            RETURNING *
            "#,
        )
        .bind(worker_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.map(Into::into))
    }

    async fn complete_job(&self, job_id: Uuid, summary: &JobSummary) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE fingerprint_jobs
            SET status = 'completed', completed_at = NOW(), updated_at = NOW(),
                error_message = NULL, worker_id = NULL,
                captures = $2, stored = $3, skipped = $4, failed = $5
            WHERE id = $1 AND status = 'running'
            "#,
        )
        .bind(job_id)
        .bind(summary.captures as i32)
        .bind(summary.stored as i32)
        .bind(summary.skipped as i32)
        .bind(summary.failed as i32)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn fail_job(&self, job_id: Uuid, error: &str) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE fingerprint_jobs
            SET status = 'failed', completed_at = NOW(), updated_at = NOW(),
                error_message = $2, worker_id = NULL
            WHERE id = $1 AND status = 'running'
            "#,
        )
        .bind(job_id)
        .bind(error)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn cancel_job(&self, job_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE fingerprint_jobs
            SET status = 'cancelled', completed_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND status IN ('pending', 'running')
            "#,
        )
        .bind(job_id)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_job(&self, job_id: Uuid) -> Result<Option<FingerprintJob>, AppError> {
        let row =
            sqlx::query_as::<_, JobRow>(r#"SELECT * FROM fingerprint_jobs WHERE id = $1"#)
                .bind(job_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error)?;

        Ok(row.map(Into::into))
    }

    async fn find_active(&self, url: &str, year: i32) -> Result<Option<FingerprintJob>, AppError> {
        let row = sqlx::query_as::<_, JobRow>(
            r#"
            SELECT * FROM fingerprint_jobs
            WHERE url = $1 AND year = $2 AND status IN ('pending', 'running')
            "#,
        )
        .bind(url)
        .bind(year)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.map(Into::into))
    }

    async fn list_jobs(
        &self,
        status: Option<JobStatus>,
        limit: usize,
    ) -> Result<Vec<FingerprintJob>, AppError> {
        let rows = sqlx::query_as::<_, JobRow>(
            r#"
            SELECT * FROM fingerprint_jobs
            WHERE $1::text IS NULL OR status = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(status.map(|s| s.as_str()))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn release_job(&self, job_id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE fingerprint_jobs
            SET status = 'pending', worker_id = NULL, started_at = NULL, updated_at = NOW()
            WHERE id = $1 AND status = 'running'
            "#,
        )
        .bind(job_id)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn release_worker_jobs(&self, worker_id: &str) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE fingerprint_jobs
            SET status = 'pending', worker_id = NULL, started_at = NULL, updated_at = NOW()
            WHERE worker_id = $1 AND status = 'running'
            "#,
        )
        .bind(worker_id)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(result.rows_affected())
    }

    async fn purge_finished(&self, ttl: Duration) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            DELETE FROM fingerprint_jobs
            WHERE status IN ('completed', 'failed', 'cancelled')
              AND updated_at < NOW() - make_interval(secs => $1)
            "#,
        )
        .bind(ttl.as_secs_f64())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(result.rows_affected())
    }
}
