use std::time::Duration;

use crate::error::AppError;

pub const DEFAULT_INDEX_URL: &str = "http://web.archive.org/cdx/search/cdx";
pub const DEFAULT_REPLAY_URL: &str = "http://web.archive.org";

/// Immutable runtime configuration, built once at startup and passed by
/// reference into each component constructor.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Configured fingerprint width in bits; clamped to `[1, 64]` at use.
    pub simhash_size: u32,
    /// Time-to-live of persisted fingerprints.
    pub simhash_expire_after: Duration,
    /// Number of concurrent worker slots.
    pub threads: usize,
    /// Sent as the `cdx_auth_token` cookie when present.
    pub cdx_auth_token: Option<String>,
    /// Capture failures tolerated before a job aborts.
    pub max_errors: u32,
    /// Capture bodies are truncated to this many bytes.
    pub max_download_size: usize,
    /// Optional cap on captures requested from the index per job.
    pub snapshots_per_year: Option<u32>,
    pub fetch_timeout: Duration,
    pub index_url: String,
    pub replay_url: String,
    /// Retention of finished job records.
    pub job_ttl: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            simhash_size: 64,
            simhash_expire_after: Duration::from_secs(86_400),
            threads: 4,
            cdx_auth_token: None,
            max_errors: 10,
            max_download_size: 1_000_000,
            snapshots_per_year: None,
            fetch_timeout: Duration::from_secs(20),
            index_url: DEFAULT_INDEX_URL.to_string(),
            replay_url: DEFAULT_REPLAY_URL.to_string(),
            job_ttl: Duration::from_secs(86_400),
        }
    }
}

impl AppConfig {
    /// Read configuration from `WDD_*` environment variables, falling back to
    /// [`Default`] for anything unset.
    ///
    /// - `WDD_SIMHASH_SIZE`, `WDD_SIMHASH_EXPIRE_AFTER` (seconds)
    /// - `WDD_THREADS`, `WDD_MAX_ERRORS` (both at least 1)
    /// - `WDD_CDX_AUTH_TOKEN`, `WDD_MAX_DOWNLOAD_SIZE`, `WDD_SNAPSHOTS_PER_YEAR`
    /// - `WDD_FETCH_TIMEOUT` (seconds), `WDD_INDEX_URL`, `WDD_REPLAY_URL`
    /// - `WDD_JOB_TTL` (seconds)
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) but reading from an arbitrary source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let simhash_size = parse_or(&lookup, "WDD_SIMHASH_SIZE", defaults.simhash_size)?;
        if simhash_size == 0 {
            return Err(AppError::ConfigError(
                "WDD_SIMHASH_SIZE must be at least 1".into(),
            ));
        }

        let threads = parse_or(&lookup, "WDD_THREADS", defaults.threads)?;
        if threads == 0 {
            return Err(AppError::ConfigError("WDD_THREADS must be at least 1".into()));
        }

        let max_errors = parse_or(&lookup, "WDD_MAX_ERRORS", defaults.max_errors)?;
        if max_errors == 0 {
            return Err(AppError::ConfigError(
                "WDD_MAX_ERRORS must be at least 1".into(),
            ));
        }

        let cdx_auth_token = lookup("WDD_CDX_AUTH_TOKEN").filter(|t| !t.trim().is_empty());
        let snapshots_per_year = match lookup("WDD_SNAPSHOTS_PER_YEAR") {
            None => None,
            Some(raw) => Some(parse_value("WDD_SNAPSHOTS_PER_YEAR", &raw)?),
        };

        Ok(Self {
            simhash_size,
            simhash_expire_after: Duration::from_secs(parse_or(
                &lookup,
                "WDD_SIMHASH_EXPIRE_AFTER",
                defaults.simhash_expire_after.as_secs(),
            )?),
            threads,
            cdx_auth_token,
            max_errors,
            max_download_size: parse_or(
                &lookup,
                "WDD_MAX_DOWNLOAD_SIZE",
                defaults.max_download_size,
            )?,
            snapshots_per_year,
            fetch_timeout: Duration::from_secs(parse_or(
                &lookup,
                "WDD_FETCH_TIMEOUT",
                defaults.fetch_timeout.as_secs(),
            )?),
            index_url: lookup("WDD_INDEX_URL").unwrap_or(defaults.index_url),
            replay_url: lookup("WDD_REPLAY_URL").unwrap_or(defaults.replay_url),
            job_ttl: Duration::from_secs(parse_or(
                &lookup,
                "WDD_JOB_TTL",
                defaults.job_ttl.as_secs(),
            )?),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, AppError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => parse_value(key, &raw),
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, AppError> {
    raw.trim().parse().map_err(|_| {
        AppError::ConfigError(format!(
            "Invalid {key} '{raw}': must be a non-negative integer"
        ))
    })
}
