//! Catalog collaborators: where page lists come from.
//!
//! The download pipeline only needs an ordered list of [`PageDescriptor`]s.
//! [`CatalogSource`] is the seam between that pipeline and whatever API
//! enumerates flyers; [`LeclercCatalog`] is the one shipped implementation.

pub mod client;
pub mod types;

pub use client::{CatalogConfig, LeclercCatalog, DEFAULT_LOCATOR_KEY};
pub use types::{GeoPosition, Locality, PageDescriptor, Prospectus, Store};

use crate::error::Flyer2PdfError;
use async_trait::async_trait;

/// Enumerates flyers, the stores that carry them, and their pages.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Current flyers, in the order the API lists them.
    async fn list_prospectuses(&self) -> Result<Vec<Prospectus>, Flyer2PdfError>;

    /// Store identifiers the flyer `prospectus_id` is published for.
    async fn available_stores(&self, prospectus_id: &str) -> Result<Vec<String>, Flyer2PdfError>;

    /// Page images of `prospectus_id` as distributed in `store_id`.
    async fn page_descriptors(
        &self,
        prospectus_id: &str,
        store_id: &str,
    ) -> Result<Vec<PageDescriptor>, Flyer2PdfError>;
}
