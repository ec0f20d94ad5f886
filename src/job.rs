//! Job entry points: page list in, one PDF out.
//!
//! ## Flow
//!
//! 1. Sanitise the title into a path component.
//! 2. Download every page into `work_root/<title>/` (resumable).
//! 3. Probe the first page for the shared page size.
//! 4. Bind all pages into `output_dir/<title>.pdf`.
//! 5. Remove the working directory; failure here only logs a warning.
//!
//! Any failure in steps 2–4 leaves the working directory in place so the
//! next run skips pages that are already there.

use crate::catalog::{CatalogSource, PageDescriptor, Prospectus};
use crate::config::JobConfig;
use crate::error::Flyer2PdfError;
use crate::output::{JobOutput, JobStats};
use crate::pipeline::assemble::assemble_document;
use crate::pipeline::download::PageDownloader;
use crate::pipeline::fetch::RetryingFetcher;
use crate::pipeline::probe::probe_file;
use crate::pipeline::sanitize::sanitize_for_filesystem;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Extension of the output document.
pub const DOCUMENT_EXTENSION: &str = "pdf";

/// Working directory and output file a job titled `title` would use.
pub fn job_paths(title: &str, config: &JobConfig) -> (PathBuf, PathBuf) {
    let name = sanitize_for_filesystem(title, config.filesystem);
    let work_dir = config.work_root.join(&name);
    let output_path = config
        .output_dir
        .join(format!("{name}.{DOCUMENT_EXTENSION}"));
    (work_dir, output_path)
}

/// Download `pages` and bind them into a PDF named after `title`.
///
/// # Errors
/// - [`Flyer2PdfError::NoPages`] if `pages` is empty
/// - [`Flyer2PdfError::PageDownloadFailed`] / [`Flyer2PdfError::PageWriteFailed`]
/// - [`Flyer2PdfError::Probe`] if the first page is not a usable JPEG
/// - [`Flyer2PdfError::AssemblyFailed`]
pub async fn run_job(
    title: &str,
    pages: &[PageDescriptor],
    config: &JobConfig,
) -> Result<JobOutput, Flyer2PdfError> {
    let total_start = Instant::now();
    if pages.is_empty() {
        return Err(Flyer2PdfError::NoPages {
            title: title.to_string(),
        });
    }

    let (work_dir, output_path) = job_paths(title, config);
    info!(
        "Job '{}': {} pages → {}",
        title,
        pages.len(),
        output_path.display()
    );

    // ── Step 1: Download ─────────────────────────────────────────────────
    let download_start = Instant::now();
    let fetcher = RetryingFetcher::from_config(config)?;
    let downloader = PageDownloader::new(fetcher, config.concurrency);
    let report = downloader
        .download_all(pages, &work_dir, config.progress_callback.clone())
        .await?;
    let download_duration_ms = download_start.elapsed().as_millis() as u64;

    // ── Step 2: Page size from the first page ────────────────────────────
    // Every page is assumed to share this geometry; later pages are not checked here.
    let first = &report.pages[0];
    let page_size = probe_file(&first.path).await?;
    debug!(
        "Page size {}x{} from {}",
        page_size.width,
        page_size.height,
        first.path.display()
    );

    // ── Step 3: Assemble ─────────────────────────────────────────────────
    if let Some(ref cb) = config.progress_callback {
        cb.on_assembly_start(report.pages.len());
    }
    let assembly_start = Instant::now();
    let summary = assemble_document(&output_path, &report.paths(), page_size, Some(title)).await?;
    let assembly_duration_ms = assembly_start.elapsed().as_millis() as u64;

    // ── Step 4: Cleanup ──────────────────────────────────────────────────
    let cleaned_up = if config.keep_pages {
        false
    } else {
        remove_work_dir(&work_dir).await
    };

    let stats = JobStats {
        fetched_pages: report.fetched,
        resumed_pages: report.resumed,
        output_bytes: summary.bytes_written,
        cleaned_up,
        download_duration_ms,
        assembly_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Job '{}' complete: {} pages, {}ms total",
        title, summary.pages_written, stats.total_duration_ms
    );

    Ok(JobOutput {
        output_path,
        page_size,
        pages: summary.pages_written,
        stats,
    })
}

/// Check availability, list pages, and run the job for one flyer and store.
///
/// # Errors
/// [`Flyer2PdfError::StoreUnavailable`] if `store_id` does not carry the
/// flyer, plus any catalog or [`run_job`] error.
pub async fn acquire(
    catalog: &dyn CatalogSource,
    prospectus: &Prospectus,
    store_id: &str,
    config: &JobConfig,
) -> Result<JobOutput, Flyer2PdfError> {
    let stores = catalog.available_stores(&prospectus.id).await?;
    if !stores.iter().any(|s| s == store_id) {
        return Err(Flyer2PdfError::StoreUnavailable {
            prospectus: prospectus.id.clone(),
            store: store_id.to_string(),
        });
    }

    let pages = catalog.page_descriptors(&prospectus.id, store_id).await?;
    run_job(&prospectus.title, &pages, config).await
}

/// Synchronous wrapper around [`run_job`].
///
/// Creates a temporary tokio runtime internally.
pub fn run_job_sync(
    title: &str,
    pages: &[PageDescriptor],
    config: &JobConfig,
) -> Result<JobOutput, Flyer2PdfError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Flyer2PdfError::Internal(format!("Failed to create tokio runtime: {e}")))?
        .block_on(run_job(title, pages, config))
}

/// Best-effort removal; returns whether the directory is gone.
async fn remove_work_dir(dir: &Path) -> bool {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => {
            debug!("Removed working directory {}", dir.display());
            true
        }
        Err(e) => {
            warn!(
                "Could not remove working directory {}: {}",
                dir.display(),
                e
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::sanitize::FilesystemProfile;

    #[test]
    fn paths_use_sanitised_title() {
        let config = JobConfig::builder()
            .work_root("/w")
            .output_dir("/o")
            .filesystem(FilesystemProfile::Linux)
            .build()
            .unwrap();
        let (work, out) = job_paths("Offres 12/03 au 23/03. ", &config);
        assert_eq!(work, PathBuf::from("/w/Offres 1203 au 2303"));
        assert_eq!(out, PathBuf::from("/o/Offres 1203 au 2303.pdf"));
    }

    #[tokio::test]
    async fn empty_page_list_fails_fast() {
        let err = run_job("t", &[], &JobConfig::default()).await.unwrap_err();
        assert!(matches!(err, Flyer2PdfError::NoPages { .. }));
    }

    #[tokio::test]
    async fn missing_work_dir_cleanup_reports_false() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!remove_work_dir(&dir.path().join("nope")).await);
        let sub = dir.path().join("pages");
        std::fs::create_dir(&sub).unwrap();
        std::fs::write(sub.join("000.jpg"), b"x").unwrap();
        assert!(remove_work_dir(&sub).await);
        assert!(!sub.exists());
    }
}
