//! Configuration types for a download-and-bind job.
//!
//! All job behaviour is controlled through [`JobConfig`], built via its
//! [`JobConfigBuilder`]. Catalog API endpoints live separately in
//! [`crate::catalog::CatalogConfig`] because a job can run from any page
//! list, not only one the catalog client produced.

use crate::error::Flyer2PdfError;
use crate::pipeline::fetch::Transport;
use crate::pipeline::sanitize::FilesystemProfile;
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

pub const DEFAULT_USER_AGENT: &str = concat!("flyer2pdf/", env!("CARGO_PKG_VERSION"));

/// Configuration for one job.
///
/// # Example
/// ```rust
/// use flyer2pdf::JobConfig;
///
/// let config = JobConfig::builder()
///     .concurrency(3)
///     .max_attempts(3)
///     .output_dir("out")
///     .build()
///     .unwrap();
/// assert_eq!(config.concurrency, 3);
/// ```
#[derive(Clone)]
pub struct JobConfig {
    /// Maximum page fetches in flight at once. Default: 3.
    pub concurrency: usize,

    /// Attempts per page, counting the first. Default: 3.
    pub max_attempts: u32,

    /// Delay before the second attempt in milliseconds, doubled after each
    /// further failure. Default: 0 (retry immediately).
    pub retry_backoff_ms: u64,

    /// Per-request HTTP timeout in seconds. Default: 60.
    pub request_timeout_secs: u64,

    /// Directory the finished PDF is written to. Default: ".".
    pub output_dir: PathBuf,

    /// Parent of the per-job working directory. Default: ".".
    pub work_root: PathBuf,

    /// Character rules for the working directory and PDF names. Default: host.
    pub filesystem: FilesystemProfile,

    /// Keep the downloaded page images after the PDF is written. Default: false.
    pub keep_pages: bool,

    /// `User-Agent` for the built-in HTTP transport.
    pub user_agent: String,

    /// Pre-constructed transport. Takes precedence over the built-in HTTP one.
    pub transport: Option<Arc<dyn Transport>>,

    /// Receives download progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            concurrency: 3,
            max_attempts: 3,
            retry_backoff_ms: 0,
            request_timeout_secs: 60,
            output_dir: PathBuf::from("."),
            work_root: PathBuf::from("."),
            filesystem: FilesystemProfile::host(),
            keep_pages: false,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            transport: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for JobConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobConfig")
            .field("concurrency", &self.concurrency)
            .field("max_attempts", &self.max_attempts)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("output_dir", &self.output_dir)
            .field("work_root", &self.work_root)
            .field("filesystem", &self.filesystem)
            .field("keep_pages", &self.keep_pages)
            .field("user_agent", &self.user_agent)
            .field("transport", &self.transport.as_ref().map(|_| "<dyn Transport>"))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn DownloadProgressCallback>"),
            )
            .finish()
    }
}

impl JobConfig {
    /// Create a new builder for `JobConfig`.
    pub fn builder() -> JobConfigBuilder {
        JobConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`JobConfig`].
#[derive(Debug)]
pub struct JobConfigBuilder {
    config: JobConfig,
}

impl JobConfigBuilder {
    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n;
        self
    }

    pub fn max_attempts(mut self, n: u32) -> Self {
        self.config.max_attempts = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn work_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.work_root = dir.into();
        self
    }

    pub fn filesystem(mut self, profile: FilesystemProfile) -> Self {
        self.config.filesystem = profile;
        self
    }

    pub fn keep_pages(mut self, v: bool) -> Self {
        self.config.keep_pages = v;
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config.user_agent = ua.into();
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.config.transport = Some(transport);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<JobConfig, Flyer2PdfError> {
        let c = &self.config;
        if c.concurrency == 0 {
            return Err(Flyer2PdfError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        if c.max_attempts == 0 {
            return Err(Flyer2PdfError::InvalidConfig(
                "Attempts per page must be ≥ 1".into(),
            ));
        }
        if c.request_timeout_secs == 0 {
            return Err(Flyer2PdfError::InvalidConfig(
                "Request timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}
