//! Result types returned by [`crate::job`].

use crate::pipeline::probe::ImageDimensions;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Everything a finished job produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobOutput {
    /// Where the PDF was written.
    pub output_path: PathBuf,
    /// Page size taken from the first page, in pixels (= PDF points).
    pub page_size: ImageDimensions,
    /// Number of pages in the PDF.
    pub pages: usize,
    pub stats: JobStats,
}

/// Counters and timings for one job.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobStats {
    /// Pages fetched over the network during this run.
    pub fetched_pages: usize,
    /// Pages reused from an earlier, interrupted run.
    pub resumed_pages: usize,
    pub output_bytes: u64,
    /// Whether the working directory was removed.
    pub cleaned_up: bool,
    pub download_duration_ms: u64,
    pub assembly_duration_ms: u64,
    pub total_duration_ms: u64,
}
