pub mod config;
pub mod database;
pub mod fingerprint_repository;
pub mod job_repository;

pub use config::DatabaseConfig;
pub use database::Database;
pub use fingerprint_repository::FingerprintRepository;
pub use job_repository::FingerprintJobRepository;

use wdd_core::AppError;

/// Every sqlx failure surfaces as [`AppError::DatabaseError`].
pub(crate) fn db_error(e: sqlx::Error) -> AppError {
    AppError::DatabaseError(e.to_string())
}
