use std::time::Duration;

use sqlx::PgPool;
use wdd_core::error::AppError;
use wdd_core::models::{FingerprintKey, StoredFingerprint};
use wdd_core::traits::FingerprintStore;

use crate::db_error;

/// PostgreSQL-backed fingerprint store.
///
/// Expiry is enforced on read (`expires_at > NOW()`); expired rows linger
/// until [`purge_expired`](FingerprintStore::purge_expired) deletes them.
#[derive(Clone)]
pub struct FingerprintRepository {
    pool: PgPool,
}

impl FingerprintRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct FingerprintRow {
    capture_timestamp: String,
    simhash: String,
}

impl From<FingerprintRow> for StoredFingerprint {
    fn from(row: FingerprintRow) -> Self {
        StoredFingerprint {
            timestamp: row.capture_timestamp,
            simhash: row.simhash,
        }
    }
}

impl FingerprintStore for FingerprintRepository {
    async fn exists(&self, key: &FingerprintKey) -> Result<bool, AppError> {
        let (exists,): (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM fingerprints
                WHERE url = $1 AND capture_timestamp = $2 AND expires_at > NOW()
            )
            "#,
        )
        .bind(&key.url)
        .bind(&key.timestamp)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(exists)
    }

    async fn get(&self, key: &FingerprintKey) -> Result<Option<String>, AppError> {
        let row: Option<(String,)> = sqlx::query_as(
            r#"
            SELECT simhash FROM fingerprints
            WHERE url = $1 AND capture_timestamp = $2 AND expires_at > NOW()
            "#,
        )
        .bind(&key.url)
        .bind(&key.timestamp)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.map(|(simhash,)| simhash))
    }

    async fn set(&self, key: &FingerprintKey, simhash: &str, ttl: Duration) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO fingerprints (url, capture_timestamp, simhash, expires_at)
            VALUES ($1, $2, $3, NOW() + make_interval(secs => $4))
            ON CONFLICT (url, capture_timestamp) DO UPDATE
            SET simhash = EXCLUDED.simhash,
                expires_at = EXCLUDED.expires_at,
                created_at = NOW()
            WHERE fingerprints.expires_at <= NOW()
            "#,
        )
        .bind(&key.url)
        .bind(&key.timestamp)
        .bind(simhash)
        .bind(ttl.as_secs_f64())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn list_for_url(&self, url: &str) -> Result<Vec<StoredFingerprint>, AppError> {
        let rows = sqlx::query_as::<_, FingerprintRow>(
            r#"
            SELECT capture_timestamp, simhash FROM fingerprints
            WHERE url = $1 AND expires_at > NOW()
            ORDER BY capture_timestamp ASC
            "#,
        )
        .bind(url)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn purge_expired(&self) -> Result<u64, AppError> {
        let result = sqlx::query(r#"DELETE FROM fingerprints WHERE expires_at <= NOW()"#)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(result.rows_affected())
    }
}
