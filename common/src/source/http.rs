// Live value source backed by a remote spreadsheet API

use crate::config::SourceConfig;
use crate::errors::FetchError;
use crate::models::Grid;
use crate::source::ValueSource;
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use std::time::Duration;

/// Response shape of a values read: `values` is omitted entirely when the
/// requested range is empty
#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

/// LiveValueSource reads cell values over HTTP from a spreadsheet API
pub struct LiveValueSource {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    bearer_token: Option<String>,
}

impl LiveValueSource {
    /// Create a new live source for the configured API endpoint
    pub fn new(config: &SourceConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.fetch_timeout_seconds))
            .build()
            .map_err(|e| FetchError::Request(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            bearer_token: config.bearer_token.clone(),
        })
    }

    /// Build the values-read URL: `{base_url}/{source_id}/values/{range}`
    fn values_url(&self, source_id: &str, range: &str) -> Result<Url, FetchError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| FetchError::Request(format!("Invalid base URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| FetchError::Request("Base URL cannot carry path segments".to_string()))?
            .pop_if_empty()
            .push(source_id)
            .push("values")
            .push(range);
        if let Some(key) = &self.api_key {
            url.query_pairs_mut().append_pair("key", key);
        }
        Ok(url)
    }

    fn render_cell(value: &serde_json::Value) -> String {
        match value {
            serde_json::Value::Null => String::new(),
            serde_json::Value::String(text) => text.clone(),
            serde_json::Value::Number(number) => number.to_string(),
            serde_json::Value::Bool(flag) => flag.to_string(),
            other => other.to_string(),
        }
    }
}

#[async_trait]
impl ValueSource for LiveValueSource {
    #[tracing::instrument(skip(self), fields(source_id = %source_id, range = %range))]
    async fn fetch(
        &self,
        source_id: &str,
        range: &str,
        timeout: Duration,
    ) -> Result<Grid, FetchError> {
        let url = self.values_url(source_id, range)?;

        let mut request = self.client.get(url).timeout(timeout);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(timeout.as_secs())
            } else {
                FetchError::Request(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => FetchError::Auth(body),
                StatusCode::NOT_FOUND => FetchError::SourceNotFound(source_id.to_string()),
                _ => FetchError::Status {
                    status: status.as_u16(),
                    body,
                },
            });
        }

        let value_range: ValueRange = response
            .json()
            .await
            .map_err(|e| FetchError::MalformedPayload(e.to_string()))?;

        let grid = value_range
            .values
            .iter()
            .map(|row| row.iter().map(Self::render_cell).collect())
            .collect();

        tracing::debug!(source_id = %source_id, range = %range, "Fetched values from source");
        Ok(grid)
    }
}
