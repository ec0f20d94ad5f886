//! Pipeline stages for flyer-to-PDF jobs.
//!
//! ## Data Flow
//!
//! ```text
//! pages ──▶ fetch ──▶ download ──▶ probe ──▶ assemble
//! (URLs)    (retry)   (parallel)   (SOF)     (lopdf)
//! ```
//!
//! 1. [`fetch`]    — one URL to bytes through a [`fetch::Transport`], retried
//!    up to a fixed attempt budget
//! 2. [`download`] — bounded-concurrency fetch of every page into the
//!    working directory, skipping pages already on disk
//! 3. [`probe`]    — read width/height from the first page's JPEG frame
//!    header without decoding pixels
//! 4. [`assemble`] — one PDF page per JPEG, image bytes embedded verbatim;
//!    runs in `spawn_blocking`
//!
//! [`sanitize`] turns the flyer title into the directory and file name.

pub mod assemble;
pub mod download;
pub mod fetch;
pub mod probe;
pub mod sanitize;
