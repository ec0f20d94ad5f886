//! Error types for the flyer2pdf library.
//!
//! The taxonomy follows the pipeline stages:
//!
//! * [`ProbeError`] — the JPEG header scan could not find a usable frame
//!   header. Without it no page size can be chosen.
//!
//! * [`TransportError`] — a single HTTP attempt failed. Never surfaced on its
//!   own; [`crate::pipeline::fetch::RetryingFetcher`] absorbs it until the
//!   retry budget runs out.
//!
//! * [`FetchError`] — the retry budget for one URL is exhausted. Carries the
//!   last attempt's [`TransportError`] as its source.
//!
//! * [`Flyer2PdfError`] — **Fatal**: the job cannot produce a document.
//!   There is no partial-success mode. Pages already written to the working
//!   directory stay on disk so a re-run only fetches what is missing.

use std::path::PathBuf;
use thiserror::Error;

/// Structural problems found while scanning a JPEG buffer for its frame header.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    /// The buffer does not start with the JPEG start-of-image signature.
    #[error("Not a JPEG image: expected start-of-image marker FF D8, got {found:02X?}")]
    NotSupportedFormat { found: Vec<u8> },

    /// The marker table is corrupt or ends before a frame header.
    #[error("Malformed JPEG at byte {offset}: {reason}")]
    MalformedImage { offset: usize, reason: String },

    /// A segment declares more bytes than remain in the buffer.
    #[error(
        "Truncated JPEG at byte {offset}: segment declares {declared} bytes but only {remaining} remain"
    )]
    TruncatedInput {
        offset: usize,
        declared: usize,
        remaining: usize,
    },
}

/// One failed transport attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Server answered with a non-success status.
    #[error("HTTP {status}")]
    Status { status: u16 },

    /// The request did not complete within the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// Connection, TLS or body-read failure.
    #[error("{0}")]
    Request(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else if let Some(status) = e.status() {
            TransportError::Status {
                status: status.as_u16(),
            }
        } else {
            TransportError::Request(e.to_string())
        }
    }
}

/// A resource could not be fetched within the retry budget.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("Failed to fetch '{url}' after {attempts} attempts: {last_error}")]
    FetchFailed {
        url: String,
        attempts: u32,
        #[source]
        last_error: TransportError,
    },
}

/// All fatal errors returned by the flyer2pdf library.
#[derive(Debug, Error)]
pub enum Flyer2PdfError {
    // ── Download errors ───────────────────────────────────────────────────
    /// One page exhausted its retry budget; the whole job fails.
    #[error("Page {index} could not be downloaded: {cause}")]
    PageDownloadFailed {
        index: u32,
        #[source]
        cause: FetchError,
    },

    /// A fetched page could not be written into the working directory.
    #[error("Failed to write page {index} to '{path}': {source}")]
    PageWriteFailed {
        index: u32,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The job working directory could not be created.
    #[error("Failed to create working directory '{path}': {source}")]
    WorkDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The page list handed to the job was empty.
    #[error("No pages to download for '{title}'")]
    NoPages { title: String },

    // ── Geometry errors ───────────────────────────────────────────────────
    /// The first page could not be probed for its pixel dimensions.
    #[error("Cannot determine page size from '{path}': {source}")]
    Probe {
        path: PathBuf,
        #[source]
        source: ProbeError,
    },

    /// A downloaded page could not be read back.
    #[error("Failed to read page '{path}': {source}")]
    PageReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Output errors ─────────────────────────────────────────────────────
    /// The output document could not be assembled or written.
    #[error("Failed to assemble '{path}': {detail}")]
    AssemblyFailed { path: PathBuf, detail: String },

    // ── Catalog errors ────────────────────────────────────────────────────
    /// The selected store does not carry the selected prospectus.
    #[error("Prospectus '{prospectus}' is not available for store '{store}'")]
    StoreUnavailable { prospectus: String, store: String },

    /// A catalog API request failed.
    #[error("Catalog request to '{url}' failed: {source}")]
    CatalogRequestFailed {
        url: String,
        #[source]
        source: TransportError,
    },

    /// A catalog API answered with a body we could not decode.
    #[error("Unexpected response from '{url}': {detail}")]
    CatalogDecodeFailed { url: String, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_download_failed_display() {
        let e = Flyer2PdfError::PageDownloadFailed {
            index: 7,
            cause: FetchError::FetchFailed {
                url: "https://cdn.example/7.jpg".into(),
                attempts: 3,
                last_error: TransportError::Status { status: 503 },
            },
        };
        let msg = e.to_string();
        assert!(msg.contains("Page 7"), "got: {msg}");
        assert!(msg.contains("after 3 attempts"), "got: {msg}");
        assert!(msg.contains("HTTP 503"), "got: {msg}");
    }

    #[test]
    fn fetch_failed_exposes_last_error_as_source() {
        use std::error::Error as _;
        let e = FetchError::FetchFailed {
            url: "u".into(),
            attempts: 3,
            last_error: TransportError::Timeout,
        };
        let source = e.source().expect("source");
        assert_eq!(source.to_string(), "request timed out");
    }

    #[test]
    fn not_supported_format_shows_magic() {
        let e = ProbeError::NotSupportedFormat {
            found: vec![0x89, 0x50],
        };
        assert!(e.to_string().contains("89"), "got: {e}");
    }

    #[test]
    fn truncated_display() {
        let e = ProbeError::TruncatedInput {
            offset: 20,
            declared: 300,
            remaining: 12,
        };
        let msg = e.to_string();
        assert!(msg.contains("300"));
        assert!(msg.contains("12"));
    }

    #[test]
    fn store_unavailable_display() {
        let e = Flyer2PdfError::StoreUnavailable {
            prospectus: "24S12".into(),
            store: "1234".into(),
        };
        assert!(e.to_string().contains("24S12"));
        assert!(e.to_string().contains("1234"));
    }
}
