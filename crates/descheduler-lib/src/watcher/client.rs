//! HTTP client for fetching metrics snapshots from the load watcher

use crate::config::RetryConfig;
use crate::models::WatcherMetrics;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, warn};
use url::Url;

/// Path of the metrics endpoint, appended to the watcher address
pub const WATCHER_PATH: &str = "/watcher";

/// Overall timeout of a single request/response round trip
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors returned by [`WatcherClient::fetch_snapshot`]
#[derive(Debug, Error)]
pub enum WatcherError {
    #[error("invalid watcher address {address:?}: {source}")]
    InvalidAddress {
        address: String,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to create HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request to watcher failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("watcher responded with status {status}")]
    UnexpectedStatus { status: StatusCode },

    #[error("unable to decode watcher metrics: {0}")]
    Decode(#[source] serde_json::Error),
}

impl WatcherError {
    /// Transport failures may succeed on a later attempt; nothing else will
    pub fn is_transient(&self) -> bool {
        matches!(self, WatcherError::Transport(_))
    }
}

/// Configuration for the watcher client
#[derive(Debug, Clone)]
pub struct WatcherClientConfig {
    /// Watcher base address, e.g. "http://load-watcher:2020"
    pub address: String,
    /// Round trip timeout
    pub timeout: Duration,
    /// Retry policy for transport errors
    pub retry: RetryConfig,
}

impl WatcherClientConfig {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            timeout: DEFAULT_TIMEOUT,
            retry: RetryConfig::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Client for the load watcher
pub struct WatcherClient {
    client: Client,
    url: Url,
    retry: RetryConfig,
}

impl WatcherClient {
    /// Create a client with the default timeout and a single attempt per fetch
    pub fn new(address: &str) -> Result<Self, WatcherError> {
        Self::with_config(WatcherClientConfig::new(address))
    }

    pub fn with_config(config: WatcherClientConfig) -> Result<Self, WatcherError> {
        let endpoint = format!("{}{}", config.address.trim_end_matches('/'), WATCHER_PATH);
        let url = Url::parse(&endpoint).map_err(|source| WatcherError::InvalidAddress {
            address: config.address.clone(),
            source,
        })?;

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(WatcherError::Client)?;

        Ok(Self {
            client,
            url,
            retry: config.retry,
        })
    }

    /// Full URL of the metrics endpoint
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Fetch one snapshot, retrying transport failures per the retry policy
    pub async fn fetch_snapshot(&self) -> Result<WatcherMetrics, WatcherError> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.fetch_once().await {
                Ok(metrics) => return Ok(metrics),
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    let backoff = self.retry.backoff_for(attempt);
                    warn!(
                        error = %e,
                        attempt,
                        max_attempts,
                        backoff_ms = backoff.as_millis() as u64,
                        "Watcher request failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn fetch_once(&self) -> Result<WatcherMetrics, WatcherError> {
        let response = self
            .client
            .get(self.url.clone())
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(WatcherError::Transport)?;

        let status = response.status();
        debug!(status = status.as_u16(), "Received status code from watcher");

        if status != StatusCode::OK {
            error!(status = status.as_u16(), "Unexpected status code from watcher");
            return Err(WatcherError::UnexpectedStatus { status });
        }

        let body = response.bytes().await.map_err(WatcherError::Transport)?;

        serde_json::from_slice(&body).map_err(|e| {
            error!(error = %e, "Unable to decode watcher metrics");
            WatcherError::Decode(e)
        })
    }
}
