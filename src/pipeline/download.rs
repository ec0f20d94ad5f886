//! Concurrent page download into a job working directory.
//!
//! ## Scheduling
//!
//! Every page gets its own `tokio::spawn`ed task; a shared
//! [`tokio::sync::Semaphore`] with `concurrency` permits gates entry to the
//! fetch, so at most that many requests are in flight while the rest wait
//! for a slot. After every task has settled, results are put back in input
//! order. Completion order never leaks into the returned list.
//!
//! ## Resume
//!
//! A page whose final file (`003.jpg`) already exists as a regular file is
//! not fetched again. Bytes are written to a uniquely named `.page-*.part`
//! file in the same directory and renamed into place only once the write
//! finished, so the resume check can never mistake a half-written file for
//! a finished page. Two descriptors sharing an index each write their own
//! temp file; the last rename wins.
//!
//! ## Failure
//!
//! There is no partial result. If any page fails, the others still run to
//! completion (their files stay on disk for the next run) and the error of
//! the earliest failing page in input order is returned.

use crate::catalog::PageDescriptor;
use crate::error::Flyer2PdfError;
use crate::pipeline::fetch::RetryingFetcher;
use crate::progress::ProgressCallback;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;
use tracing::{debug, info};

/// Extension of every page file; the pipeline only handles JPEG pages.
pub const PAGE_EXTENSION: &str = "jpg";

/// A page that is present on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadedPage {
    pub index: u32,
    pub path: PathBuf,
}

/// Result of [`PageDownloader::download_all`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadReport {
    /// One entry per descriptor, in input order.
    pub pages: Vec<DownloadedPage>,
    /// Pages fetched over the network during this call.
    pub fetched: usize,
    /// Pages found on disk from an earlier run.
    pub resumed: usize,
}

impl DownloadReport {
    /// Local paths in input order.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.pages.iter().map(|p| p.path.clone()).collect()
    }
}

/// Deterministic file name for page `index`: `3` → `003.jpg`.
pub fn page_file_name(index: u32) -> String {
    format!("{index:03}.{PAGE_EXTENSION}")
}

/// Destination of page `index` inside `dest_dir`.
pub fn page_path(dest_dir: &Path, index: u32) -> PathBuf {
    dest_dir.join(page_file_name(index))
}

/// Serialises progress reporting so `completed` is observed in order.
struct ProgressTracker {
    completed: Mutex<usize>,
    total: usize,
    callback: Option<ProgressCallback>,
}

impl ProgressTracker {
    fn page_done(&self) {
        let mut completed = match self.completed.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *completed += 1;
        if let Some(ref cb) = self.callback {
            cb.on_page_complete(*completed, self.total);
        }
    }
}

enum PageOutcome {
    Fetched(DownloadedPage),
    Resumed(DownloadedPage),
}

/// Downloads page descriptors with a fixed concurrency cap.
#[derive(Debug, Clone)]
pub struct PageDownloader {
    fetcher: RetryingFetcher,
    concurrency: usize,
}

impl PageDownloader {
    /// `concurrency` values below 1 are raised to 1.
    pub fn new(fetcher: RetryingFetcher, concurrency: usize) -> Self {
        Self {
            fetcher,
            concurrency: concurrency.max(1),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Make sure every page in `pages` is present in `dest_dir`.
    ///
    /// Creates `dest_dir` if needed. Returns the pages in the order given,
    /// whatever order the fetches finished in.
    ///
    /// # Errors
    /// - [`Flyer2PdfError::PageDownloadFailed`] when a page exhausts its
    ///   retry budget
    /// - [`Flyer2PdfError::WorkDirFailed`] when `dest_dir` cannot be created
    /// - [`Flyer2PdfError::PageWriteFailed`] when a page file cannot be written
    pub async fn download_all(
        &self,
        pages: &[PageDescriptor],
        dest_dir: &Path,
        progress: Option<ProgressCallback>,
    ) -> Result<DownloadReport, Flyer2PdfError> {
        let total = pages.len();
        info!(
            "Downloading {} pages into {} ({} at a time)",
            total,
            dest_dir.display(),
            self.concurrency
        );

        tokio::fs::create_dir_all(dest_dir)
            .await
            .map_err(|e| Flyer2PdfError::WorkDirFailed {
                path: dest_dir.to_path_buf(),
                source: e,
            })?;

        if let Some(ref cb) = progress {
            cb.on_download_start(total);
        }

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let tracker = Arc::new(ProgressTracker {
            completed: Mutex::new(0),
            total,
            callback: progress.clone(),
        });

        let handles: Vec<_> = pages
            .iter()
            .map(|page| {
                let page = page.clone();
                let path = page_path(dest_dir, page.index);
                let fetcher = self.fetcher.clone();
                let semaphore = Arc::clone(&semaphore);
                let tracker = Arc::clone(&tracker);
                let progress = progress.clone();
                tokio::spawn(async move {
                    let outcome =
                        download_one(&fetcher, &semaphore, &page, path, progress.as_ref()).await?;
                    tracker.page_done();
                    Ok::<_, Flyer2PdfError>(outcome)
                })
            })
            .collect();

        // Let every task settle before deciding; no task is abandoned mid-write.
        let settled = join_all(handles).await;

        let mut report = DownloadReport {
            pages: Vec::with_capacity(total),
            fetched: 0,
            resumed: 0,
        };
        let mut first_error: Option<Flyer2PdfError> = None;

        for joined in settled {
            let result = joined
                .map_err(|e| Flyer2PdfError::Internal(format!("Download task panicked: {e}")))
                .and_then(|r| r);
            match result {
                Ok(PageOutcome::Fetched(page)) => {
                    report.fetched += 1;
                    report.pages.push(page);
                }
                Ok(PageOutcome::Resumed(page)) => {
                    report.resumed += 1;
                    report.pages.push(page);
                }
                Err(e) => {
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        if let Some(e) = first_error {
            return Err(e);
        }

        info!(
            "Download complete: {} fetched, {} already on disk",
            report.fetched, report.resumed
        );
        if let Some(ref cb) = progress {
            cb.on_download_complete(total);
        }

        Ok(report)
    }
}

async fn download_one(
    fetcher: &RetryingFetcher,
    semaphore: &Semaphore,
    page: &PageDescriptor,
    path: PathBuf,
    progress: Option<&ProgressCallback>,
) -> Result<PageOutcome, Flyer2PdfError> {
    let downloaded = DownloadedPage {
        index: page.index,
        path,
    };

    if is_present(&downloaded.path).await {
        debug!("Page {} already at {}", page.index, downloaded.path.display());
        if let Some(cb) = progress {
            cb.on_page_resumed(page.index);
        }
        return Ok(PageOutcome::Resumed(downloaded));
    }

    let bytes = {
        let _permit = semaphore
            .acquire()
            .await
            .map_err(|e| Flyer2PdfError::Internal(format!("Download limiter closed: {e}")))?;
        fetcher
            .fetch(&page.source)
            .await
            .map_err(|cause| Flyer2PdfError::PageDownloadFailed {
                index: page.index,
                cause,
            })?
    };

    let len = bytes.len();
    write_atomically(&downloaded.path, bytes)
        .await
        .map_err(|e| Flyer2PdfError::PageWriteFailed {
            index: page.index,
            path: downloaded.path.clone(),
            source: e,
        })?;

    debug!(
        "Page {} saved to {} ({} bytes)",
        page.index,
        downloaded.path.display(),
        len
    );
    Ok(PageOutcome::Fetched(downloaded))
}

/// Only a regular file counts; a directory named `001.jpg` does not.
async fn is_present(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

/// Write to a fresh temp file beside `path`, then rename over `path`.
///
/// The temp file is removed on any failure.
async fn write_atomically(path: &Path, bytes: Vec<u8>) -> std::io::Result<()> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || -> std::io::Result<()> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::Builder::new()
            .prefix(".page-")
            .suffix(".part")
            .tempfile_in(dir)?;
        tmp.write_all(&bytes)?;
        tmp.persist(&path).map_err(|e| e.error)?;
        Ok(())
    })
    .await
    .map_err(|e| std::io::Error::other(format!("page write task panicked: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_names_are_zero_padded() {
        assert_eq!(page_file_name(0), "000.jpg");
        assert_eq!(page_file_name(3), "003.jpg");
        assert_eq!(page_file_name(42), "042.jpg");
        assert_eq!(page_file_name(1234), "1234.jpg");
    }

    #[test]
    fn page_path_joins_dir() {
        let p = page_path(Path::new("/tmp/Promo"), 1);
        assert_eq!(p, PathBuf::from("/tmp/Promo/001.jpg"));
    }

    #[tokio::test]
    async fn atomic_write_leaves_no_part_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("000.jpg");
        write_atomically(&path, b"abc".to_vec()).await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"abc");
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("000.jpg")]);
    }

    #[tokio::test]
    async fn atomic_write_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("001.jpg");
        std::fs::write(&path, b"old page").unwrap();
        write_atomically(&path, b"new".to_vec()).await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"new");
    }

    #[tokio::test]
    async fn directory_with_page_name_is_not_present() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("001.jpg");
        std::fs::create_dir(&path).unwrap();
        assert!(!is_present(&path).await);
        std::fs::write(dir.path().join("002.jpg"), b"x").unwrap();
        assert!(is_present(&dir.path().join("002.jpg")).await);
    }

    #[test]
    fn report_paths_follow_page_order() {
        let report = DownloadReport {
            pages: vec![
                DownloadedPage {
                    index: 0,
                    path: "a/000.jpg".into(),
                },
                DownloadedPage {
                    index: 1,
                    path: "a/001.jpg".into(),
                },
            ],
            fetched: 2,
            resumed: 0,
        };
        assert_eq!(
            report.paths(),
            vec![PathBuf::from("a/000.jpg"), PathBuf::from("a/001.jpg")]
        );
    }
}
