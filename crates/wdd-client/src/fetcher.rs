use reqwest::Response;
use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, COOKIE};
use url::Url;
use wdd_core::config::AppConfig;
use wdd_core::error::AppError;
use wdd_core::models::{CaptureContent, is_html_content_type, validate_timestamp};
use wdd_core::traits::CaptureFetcher;

use crate::http::ArchiveClient;

/// Downloads archived captures from the replay service.
///
/// Requests `<base>/web/<timestamp>id_/<url>` and only accepts HTTP 200 with an
/// HTML content type. Bodies are truncated to `max_download_size` bytes.
#[derive(Clone)]
pub struct ReplayFetcher {
    http: ArchiveClient,
    base_url: String,
    max_download_size: usize,
}

impl ReplayFetcher {
    pub fn new(http: ArchiveClient, config: &AppConfig) -> Result<Self, AppError> {
        Url::parse(&config.replay_url).map_err(|e| {
            AppError::ConfigError(format!("Invalid replay URL '{}': {e}", config.replay_url))
        })?;
        Ok(Self {
            http,
            base_url: config.replay_url.trim_end_matches('/').to_string(),
            max_download_size: config.max_download_size,
        })
    }

    /// Raw (`id_`) replay address of one capture.
    pub fn capture_url(&self, url: &str, timestamp: &str) -> Result<String, AppError> {
        validate_timestamp(timestamp)?;
        Ok(format!("{}/web/{timestamp}id_/{url}", self.base_url))
    }
}

impl CaptureFetcher for ReplayFetcher {
    async fn fetch_capture(&self, url: &str, timestamp: &str) -> Result<CaptureContent, AppError> {
        let target = self.capture_url(url, timestamp)?;

        let mut request = self.http.inner().get(&target);
        if let Some(cookie) = self.http.auth_cookie() {
            request = request.header(COOKIE, cookie.clone());
        }

        let mut response = request
            .send()
            .await
            .map_err(|e| self.http.map_error(e))?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        if status != StatusCode::OK || !is_html_content_type(&content_type) {
            return Err(AppError::BadResponse {
                status: status.as_u16(),
                content_type,
            });
        }

        let body = read_capped(&mut response, self.max_download_size)
            .await
            .map_err(|e| self.http.map_error(e))?;
        tracing::debug!(%target, bytes = body.len(), "Capture downloaded");

        Ok(CaptureContent { body, content_type })
    }
}

/// Read at most `cap` bytes of the body, dropping the rest.
async fn read_capped(response: &mut Response, cap: usize) -> Result<Vec<u8>, reqwest::Error> {
    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        let room = cap - body.len();
        if chunk.len() >= room {
            body.extend_from_slice(&chunk[..room]);
            break;
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}
