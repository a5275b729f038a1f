use serde_json::Value;
use url::Url;
use wdd_core::config::AppConfig;
use wdd_core::error::AppError;
use wdd_core::traits::CaptureIndex;

use crate::http::ArchiveClient;

/// Capture enumerator backed by the CDX search API.
///
/// Issues one `output=json` query per `(url, year)` and returns the timestamp
/// column of every data row, in index order.
#[derive(Clone)]
pub struct CdxIndex {
    http: ArchiveClient,
    endpoint: String,
    limit: Option<u32>,
}

impl CdxIndex {
    pub fn new(http: ArchiveClient, config: &AppConfig) -> Result<Self, AppError> {
        let endpoint = Url::parse(&config.index_url).map_err(|e| {
            AppError::ConfigError(format!("Invalid index URL '{}': {e}", config.index_url))
        })?;
        Ok(Self {
            http,
            endpoint: endpoint.to_string(),
            limit: config.snapshots_per_year,
        })
    }

    fn query(&self, url: &str, year: i32) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("url", url.to_string()),
            ("from", year.to_string()),
            ("to", year.to_string()),
            ("output", "json".to_string()),
        ];
        if let Some(limit) = self.limit {
            query.push(("limit", limit.to_string()));
        }
        query
    }
}

impl CaptureIndex for CdxIndex {
    async fn list_captures(&self, url: &str, year: i32) -> Result<Vec<String>, AppError> {
        let response = self
            .http
            .inner()
            .get(&self.endpoint)
            .query(&self.query(url, year))
            .send()
            .await
            .map_err(|e| self.http.map_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::NetworkError(format!(
                "Capture index returned HTTP {} for {url}",
                status.as_u16()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AppError::NetworkError(format!("Failed to read index response: {e}")))?;

        parse_rows(&body, url, year)
    }
}

/// Extract capture timestamps from a CDX JSON response.
///
/// The first row is a header. Data rows carry the timestamp in column 1;
/// rows without one are skipped. An empty body or a header-only table
/// means the URL was not captured that year.
pub fn parse_rows(body: &str, url: &str, year: i32) -> Result<Vec<String>, AppError> {
    let no_snapshots = || AppError::NoSnapshots {
        url: url.to_string(),
        year,
    };

    if body.trim().is_empty() {
        return Err(no_snapshots());
    }

    let rows: Vec<Value> = serde_json::from_str(body)?;
    if rows.len() < 2 {
        return Err(no_snapshots());
    }

    let mut timestamps = Vec::with_capacity(rows.len() - 1);
    for row in &rows[1..] {
        match row.get(1).and_then(Value::as_str) {
            Some(ts) => timestamps.push(ts.to_string()),
            None => tracing::debug!(%url, year, %row, "Skipping malformed index row"),
        }
    }
    Ok(timestamps)
}
