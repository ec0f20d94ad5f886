//! Progress-callback trait for download and assembly events.
//!
//! Inject an [`Arc<dyn DownloadProgressCallback>`] via
//! [`crate::config::JobConfigBuilder::progress_callback`] to receive events
//! while a job runs. The CLI renders them as an `indicatif` bar; a GUI or
//! service can forward them to a channel instead.
//!
//! # Ordering
//!
//! Pages are fetched by parallel tasks, so `on_page_complete` may arrive for
//! page 5 before page 2. The `completed` counter itself is strictly
//! increasing: the downloader serialises the increment and the callback.
//!
//! # Example
//!
//! ```rust
//! use flyer2pdf::{DownloadProgressCallback, JobConfig};
//! use std::sync::Arc;
//!
//! struct Printer;
//!
//! impl DownloadProgressCallback for Printer {
//!     fn on_page_complete(&self, completed: usize, total: usize) {
//!         eprintln!("Saved image {completed}/{total}");
//!     }
//! }
//!
//! let config = JobConfig::builder()
//!     .progress_callback(Arc::new(Printer) as Arc<dyn DownloadProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the job pipeline as pages are downloaded and bound.
///
/// Implementations must be `Send + Sync`; methods may be called from
/// different tokio worker threads. All methods default to no-ops.
pub trait DownloadProgressCallback: Send + Sync {
    /// Called once before any page is fetched.
    fn on_download_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// A page was already on disk from an earlier run; no fetch was made.
    /// Always followed by `on_page_complete` for the same page.
    fn on_page_resumed(&self, index: u32) {
        let _ = index;
    }

    /// Called exactly once per page that is present on disk, fetched or
    /// resumed. `completed` runs 1..=`total` without gaps.
    fn on_page_complete(&self, completed: usize, total: usize) {
        let _ = (completed, total);
    }

    /// Called once after every page is on disk.
    fn on_download_complete(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called before the PDF is written.
    fn on_assembly_start(&self, pages: usize) {
        let _ = pages;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl DownloadProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::JobConfig`].
pub type ProgressCallback = Arc<dyn DownloadProgressCallback>;
