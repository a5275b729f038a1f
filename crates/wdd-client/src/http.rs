use reqwest::Client;
use reqwest::header::HeaderValue;
use wdd_core::config::AppConfig;
use wdd_core::error::AppError;

/// User-Agent sent on every archive request.
pub const USER_AGENT: &str = "wayback-discover-diff";

/// Shared HTTP client for the capture index and the replay service.
///
/// Cheap to clone; every clone reuses the same connection pool. The
/// `cdx_auth_token` cookie is only attached to replay requests.
#[derive(Clone)]
pub struct ArchiveClient {
    client: Client,
    auth_cookie: Option<HeaderValue>,
    timeout_secs: u64,
}

impl ArchiveClient {
    pub fn new(config: &AppConfig) -> Result<Self, AppError> {
        let auth_cookie = config
            .cdx_auth_token
            .as_deref()
            .map(|token| {
                HeaderValue::from_str(&format!("cdx_auth_token={token}"))
                    .map_err(|e| AppError::ConfigError(format!("Invalid CDX auth token: {e}")))
            })
            .transpose()?;

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.fetch_timeout)
            .build()
            .map_err(|e| AppError::NetworkError(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            auth_cookie,
            timeout_secs: config.fetch_timeout.as_secs(),
        })
    }

    /// `Cookie` header value carrying the auth token, if one is configured.
    pub(crate) fn auth_cookie(&self) -> Option<&HeaderValue> {
        self.auth_cookie.as_ref()
    }

    pub(crate) fn inner(&self) -> &Client {
        &self.client
    }

    /// Map a transport error onto the application error space.
    pub(crate) fn map_error(&self, e: reqwest::Error) -> AppError {
        if e.is_timeout() {
            AppError::Timeout(self.timeout_secs)
        } else if e.is_connect() {
            AppError::NetworkError(format!("Connection failed: {e}"))
        } else {
            AppError::NetworkError(e.to_string())
        }
    }
}
