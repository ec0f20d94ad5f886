//! Typed records returned by the catalog collaborators.

use serde::{Deserialize, Serialize};

/// One remote page image and its position in the finished document.
///
/// `index` also names the page file (`003.jpg`). Two descriptors sharing an
/// index write the same file; the last one to finish wins.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageDescriptor {
    /// Absolute URL of the page JPEG.
    pub source: String,
    pub index: u32,
}

impl PageDescriptor {
    pub fn new(source: impl Into<String>, index: u32) -> Self {
        Self {
            source: source.into(),
            index,
        }
    }
}

/// A flyer campaign as listed by the catalog API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prospectus {
    /// Operation code, e.g. `"24S12"`.
    pub id: String,
    pub title: String,
    /// ISO-8601 start date.
    pub start: String,
    /// ISO-8601 end date.
    pub end: String,
}

impl Prospectus {
    /// Human-readable menu label: `Title (2024-03-12 → 2024-03-23)`.
    pub fn label(&self) -> String {
        format!(
            "{} ({} → {})",
            self.title,
            date_part(&self.start),
            date_part(&self.end)
        )
    }
}

/// `2024-03-12T00:00:00+01:00` → `2024-03-12`; anything shorter is kept whole.
fn date_part(iso: &str) -> &str {
    match iso.get(..10) {
        Some(d) if d.as_bytes().get(4) == Some(&b'-') => d,
        _ => iso,
    }
}

/// A place returned by the postal-code autocomplete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locality {
    pub public_id: String,
    pub description: String,
}

/// Latitude/longitude of a locality.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPosition {
    pub lat: f64,
    pub lng: f64,
}

/// A store near a position. `sign_code` is the store identifier the flyer
/// API expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Store {
    pub name: String,
    pub sign_code: String,
}
