//! HTTP transport for the analytics backend
//!
//! Endpoints:
//! - `POST {base_url}/api/analytics/event`: one event
//! - `POST {base_url}/api/analytics/error`: one error record
//! - `POST {base_url}/api/analytics/batch`: `{ "events": [...] }`

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Serialize;

use crate::config::TelemetryConfig;
use crate::error::{Error, Result};
use crate::types::{ErrorRecord, Event};

use super::Transport;

/// HTTP client for the analytics ingestion API.
pub struct HttpTransport {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// Create a transport from configuration.
    ///
    /// Returns an error if the configuration is missing a base URL or the
    /// client cannot be constructed.
    pub fn new(config: &TelemetryConfig) -> Result<Self> {
        let base_url = config
            .base_url
            .clone()
            .ok_or_else(|| Error::Config("telemetry.base_url is required".to_string()))?
            .trim_end_matches('/')
            .to_string();

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(api_key) = &config.api_key {
            let auth_value = format!("Bearer {}", api_key);
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&auth_value)
                    .map_err(|e| Error::Config(format!("invalid api_key: {}", e)))?,
            );
        }

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url,
        })
    }

    async fn post_json<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<()> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .http_client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Transport(format!("HTTP request failed: {}", e)))?;

        let status = response.status();

        if status.is_success() {
            Ok(())
        } else {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown".to_string());
            Err(Error::Transport(format!(
                "API error ({}): {}",
                status, error_text
            )))
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send_event(&self, event: &Event) -> Result<()> {
        self.post_json("/api/analytics/event", event).await
    }

    async fn send_error(&self, record: &ErrorRecord) -> Result<()> {
        self.post_json("/api/analytics/error", record).await
    }

    async fn send_batch(&self, events: &[Event]) -> Result<()> {
        self.post_json("/api/analytics/batch", &BatchRequest { events })
            .await
    }
}

/// Request body for POST /api/analytics/batch
#[derive(Serialize)]
struct BatchRequest<'a> {
    events: &'a [Event],
}
