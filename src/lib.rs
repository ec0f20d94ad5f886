//! # flyer2pdf
//!
//! Download the page images of a paginated online catalog (a store flyer)
//! and bind them into a single PDF.
//!
//! ## Why this crate?
//!
//! Flyer viewers serve each page as a separate JPEG. Saving them one by one
//! is tedious and printing from the viewer rescales everything. This crate
//! fetches every page concurrently, sizes the document from the first page's
//! JPEG header, and embeds the JPEG streams untouched, so the PDF is exactly
//! as sharp as what the viewer shows.
//!
//! ## Pipeline Overview
//!
//! ```text
//! flyer + store
//!  │
//!  ├─ 1. Catalog   availability check + ordered page list
//!  ├─ 2. Download  bounded-concurrency fetch with retries, resumable
//!  ├─ 3. Probe     page size from the first JPEG's SOF segment
//!  ├─ 4. Assemble  one PDF page per JPEG (DCTDecode passthrough)
//!  └─ 5. Cleanup   working directory removed on success
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use flyer2pdf::{run_job, JobConfig, PageDescriptor};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pages = vec![
//!         PageDescriptor::new("https://example.com/p1.jpg", 0),
//!         PageDescriptor::new("https://example.com/p2.jpg", 1),
//!     ];
//!     let config = JobConfig::builder().output_dir("out").build()?;
//!     let output = run_job("Weekly offers", &pages, &config).await?;
//!     println!("{} pages → {}", output.pages, output.output_path.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `flyer2pdf` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! flyer2pdf = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod catalog;
pub mod config;
pub mod error;
pub mod job;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use catalog::{
    CatalogConfig, CatalogSource, GeoPosition, LeclercCatalog, Locality, PageDescriptor,
    Prospectus, Store, DEFAULT_LOCATOR_KEY,
};
pub use config::{JobConfig, JobConfigBuilder};
pub use error::{FetchError, Flyer2PdfError, ProbeError, TransportError};
pub use job::{acquire, job_paths, run_job, run_job_sync};
pub use output::{JobOutput, JobStats};
pub use pipeline::assemble::{assemble, assemble_document, AssemblySummary};
pub use pipeline::download::{DownloadReport, DownloadedPage, PageDownloader};
pub use pipeline::fetch::{HttpTransport, RetryingFetcher, Transport};
pub use pipeline::probe::{probe, probe_file, probe_frame, FrameHeader, ImageDimensions};
pub use pipeline::sanitize::{sanitize_for_filesystem, FilesystemProfile};
pub use progress::{DownloadProgressCallback, NoopProgressCallback, ProgressCallback};
