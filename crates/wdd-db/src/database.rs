use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use wdd_core::AppError;

use crate::config::DatabaseConfig;
use crate::fingerprint_repository::FingerprintRepository;
use crate::job_repository::FingerprintJobRepository;

static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

/// Handle to the PostgreSQL pool shared by the fingerprint store and the job queue.
///
/// Repositories are cheap views over the same pool.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Cannot connect to database: {e}")))?;

        tracing::debug!(max_connections = config.max_connections, "Database pool ready");
        Ok(Self::from_pool(pool))
    }

    /// Wrap a pool that is already connected.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply the schema in `migrations/`.
    pub async fn migrate(&self) -> Result<(), AppError> {
        MIGRATOR
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Cannot apply migrations: {e}")))
    }

    pub fn fingerprint_repo(&self) -> FingerprintRepository {
        FingerprintRepository::new(self.pool.clone())
    }

    pub fn job_repo(&self) -> FingerprintJobRepository {
        FingerprintJobRepository::new(self.pool.clone())
    }

    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| ())
            .map_err(crate::db_error)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
