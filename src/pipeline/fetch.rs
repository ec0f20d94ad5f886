//! Page fetching: one URL into memory, with a bounded retry budget.
//!
//! ## Retry Strategy
//!
//! Flyer CDNs drop the odd connection under parallel load. Every transport
//! failure is treated as retryable: connection resets, timeouts and
//! non-success statuses all go round again, and only the final attempt's
//! error is surfaced. The default budget is 3 attempts with no delay
//! between them; `retry_backoff_ms > 0` switches to doubling backoff
//! (`backoff`, `2 * backoff`, `4 * backoff`, ...).
//!
//! Fetching never touches the disk. Writing the bytes is a separate,
//! retry-free step in [`crate::pipeline::download`], so a failed attempt can
//! never leave a partial page behind.

use crate::config::JobConfig;
use crate::error::{FetchError, Flyer2PdfError, TransportError};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// A single-attempt byte source. Implementations must not retry.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch the full body at `url`.
    async fn get(&self, url: &str) -> Result<Vec<u8>, TransportError>;
}

/// [`Transport`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a client with the given per-request timeout and user agent.
    pub fn new(timeout_secs: u64, user_agent: &str) -> Result<Self, Flyer2PdfError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(user_agent)
            .build()
            .map_err(|e| Flyer2PdfError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Wrap an existing client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
            });
        }
        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }
}

/// Wraps a [`Transport`] with a fixed attempt budget.
#[derive(Clone)]
pub struct RetryingFetcher {
    transport: Arc<dyn Transport>,
    max_attempts: u32,
    backoff_ms: u64,
}

impl RetryingFetcher {
    /// `max_attempts` counts the first try; values below 1 are raised to 1.
    pub fn new(transport: Arc<dyn Transport>, max_attempts: u32) -> Self {
        Self {
            transport,
            max_attempts: max_attempts.max(1),
            backoff_ms: 0,
        }
    }

    /// Delay before the second attempt, doubled for each later one.
    pub fn with_backoff_ms(mut self, ms: u64) -> Self {
        self.backoff_ms = ms;
        self
    }

    /// Build from the job config, using `config.transport` when present.
    pub fn from_config(config: &JobConfig) -> Result<Self, Flyer2PdfError> {
        let transport: Arc<dyn Transport> = match config.transport {
            Some(ref t) => Arc::clone(t),
            None => Arc::new(HttpTransport::new(
                config.request_timeout_secs,
                &config.user_agent,
            )?),
        };
        Ok(Self::new(transport, config.max_attempts).with_backoff_ms(config.retry_backoff_ms))
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Fetch `url`, retrying every failure until the budget is spent.
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let mut last_err = TransportError::Request("no attempt made".into());

        for attempt in 1..=self.max_attempts {
            if attempt > 1 && self.backoff_ms > 0 {
                let backoff = self.backoff_ms.saturating_mul(1 << (attempt - 2).min(16));
                sleep(Duration::from_millis(backoff)).await;
            }

            match self.transport.get(url).await {
                Ok(bytes) => {
                    debug!("Fetched {} ({} bytes, attempt {})", url, bytes.len(), attempt);
                    return Ok(bytes);
                }
                Err(e) => {
                    debug!(
                        "Attempt {}/{} for {} failed: {}",
                        attempt, self.max_attempts, url, e
                    );
                    last_err = e;
                }
            }
        }

        warn!(
            "Giving up on {} after {} attempts: {}",
            url, self.max_attempts, last_err
        );
        Err(FetchError::FetchFailed {
            url: url.to_string(),
            attempts: self.max_attempts,
            last_error: last_err,
        })
    }
}

impl std::fmt::Debug for RetryingFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryingFetcher")
            .field("transport", &"<dyn Transport>")
            .field("max_attempts", &self.max_attempts)
            .field("backoff_ms", &self.backoff_ms)
            .finish()
    }
}
