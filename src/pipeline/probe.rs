//! JPEG dimension probe: read pixel width/height from the marker table.
//!
//! ## Why not decode?
//!
//! A flyer page is a multi-megabyte baseline JPEG. Decoding it only to learn
//! its size costs O(pixels); walking the marker segments up to the frame
//! header costs O(header bytes), usually well under a kilobyte. Nothing here
//! ever touches entropy-coded scan data.
//!
//! ## Marker layout
//!
//! ```text
//! FF D8                      start of image
//! FF xx  LL LL  payload…     segment, LL LL = big-endian length incl. itself
//! FF D0..D7 / 01             standalone markers, no length field
//! FF C0  LL LL  P  HH HH  WW WW  N …   frame header (SOFn)
//! ```

use crate::error::{Flyer2PdfError, ProbeError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

const MARKER_PREFIX: u8 = 0xFF;
const SOI: [u8; 2] = [0xFF, 0xD8];
const SOS: u8 = 0xDA;

/// Pixel geometry of an image. Both sides are non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

/// The interesting part of a SOFn segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Sample precision in bits (8 for baseline).
    pub precision: u8,
    pub width: u32,
    pub height: u32,
    /// Colour components; `None` when the segment is too short to say.
    pub components: Option<u8>,
}

impl FrameHeader {
    pub fn dimensions(&self) -> ImageDimensions {
        ImageDimensions {
            width: self.width,
            height: self.height,
        }
    }
}

/// Markers that carry no length field.
fn is_standalone(code: u8) -> bool {
    matches!(code, 0x01 | 0xD0..=0xD7 | 0xD8 | 0xD9)
}

/// Start-of-frame markers. C4 (DHT), C8 (JPG) and CC (DAC) share the range
/// but are not frame headers.
fn is_frame_header(code: u8) -> bool {
    matches!(
        code,
        0xC0 | 0xC1 | 0xC2 | 0xC3 | 0xC5 | 0xC6 | 0xC7 | 0xC9 | 0xCA | 0xCB | 0xCD | 0xCE | 0xCF
    )
}

/// Codes that may legally follow the FF prefix (FF itself is fill and
/// handled separately).
fn is_valid_code(code: u8) -> bool {
    code == 0x01 || (0xC0..=0xFE).contains(&code)
}

/// Return the pixel size encoded in the first frame header of `buf`.
pub fn probe(buf: &[u8]) -> Result<ImageDimensions, ProbeError> {
    probe_frame(buf).map(|f| f.dimensions())
}

/// Walk the marker table of `buf` and return the first frame header.
pub fn probe_frame(buf: &[u8]) -> Result<FrameHeader, ProbeError> {
    if buf.len() < 2 || buf[..2] != SOI {
        return Err(ProbeError::NotSupportedFormat {
            found: buf.iter().take(2).copied().collect(),
        });
    }

    let mut pos = 2;
    loop {
        if pos >= buf.len() {
            return Err(malformed(pos, "no frame header before end of data"));
        }
        if buf[pos] != MARKER_PREFIX {
            return Err(malformed(
                pos,
                format!("expected marker prefix FF, found {:02X}", buf[pos]),
            ));
        }

        // Any number of FF fill bytes may precede the marker code.
        let mut code_pos = pos + 1;
        while code_pos < buf.len() && buf[code_pos] == MARKER_PREFIX {
            code_pos += 1;
        }
        let Some(&code) = buf.get(code_pos) else {
            return Err(malformed(code_pos, "no frame header before end of data"));
        };
        if !is_valid_code(code) {
            return Err(malformed(
                code_pos,
                format!("invalid marker code {code:02X}"),
            ));
        }

        if is_standalone(code) {
            pos = code_pos + 1;
            continue;
        }
        if code == SOS {
            return Err(malformed(code_pos, "scan data reached before any frame header"));
        }

        let len_pos = code_pos + 1;
        let remaining = buf.len() - len_pos;
        if remaining < 2 {
            return Err(ProbeError::TruncatedInput {
                offset: len_pos,
                declared: 2,
                remaining,
            });
        }
        let length = u16::from_be_bytes([buf[len_pos], buf[len_pos + 1]]) as usize;
        if length < 2 {
            return Err(malformed(len_pos, format!("segment length {length} is below 2")));
        }
        if length > remaining {
            return Err(ProbeError::TruncatedInput {
                offset: len_pos,
                declared: length,
                remaining,
            });
        }

        if is_frame_header(code) {
            return read_frame_header(&buf[len_pos..len_pos + length], len_pos);
        }

        debug!("Skipping marker {:02X} ({} bytes) at {}", code, length, code_pos - 1);
        pos = len_pos + length;
    }
}

/// `segment` starts at the length field.
fn read_frame_header(segment: &[u8], offset: usize) -> Result<FrameHeader, ProbeError> {
    if segment.len() < 7 {
        return Err(malformed(
            offset,
            format!("frame header too short ({} bytes)", segment.len()),
        ));
    }
    let precision = segment[2];
    let height = u16::from_be_bytes([segment[3], segment[4]]) as u32;
    let width = u16::from_be_bytes([segment[5], segment[6]]) as u32;
    if width == 0 || height == 0 {
        return Err(malformed(
            offset,
            format!("frame header declares {width}x{height}"),
        ));
    }
    Ok(FrameHeader {
        precision,
        width,
        height,
        components: segment.get(7).copied(),
    })
}

fn malformed(offset: usize, reason: impl Into<String>) -> ProbeError {
    ProbeError::MalformedImage {
        offset,
        reason: reason.into(),
    }
}

/// Read `path` and probe it.
pub async fn probe_file(path: &Path) -> Result<ImageDimensions, Flyer2PdfError> {
    let buf = tokio::fs::read(path)
        .await
        .map_err(|e| Flyer2PdfError::PageReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
    probe(&buf).map_err(|e| Flyer2PdfError::Probe {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app0() -> Vec<u8> {
        vec![
            0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0, 1, 1, 0, 0, 1, 0, 1, 0, 0,
        ]
    }

    fn sof(code: u8, width: u16, height: u16) -> Vec<u8> {
        let mut v = vec![0xFF, code, 0x00, 0x11, 0x08];
        v.extend_from_slice(&height.to_be_bytes());
        v.extend_from_slice(&width.to_be_bytes());
        v.extend_from_slice(&[0x03, 0x01, 0x22, 0x00, 0x02, 0x11, 0x01, 0x03, 0x11, 0x01]);
        v
    }

    fn jpeg(segments: &[Vec<u8>]) -> Vec<u8> {
        let mut v = SOI.to_vec();
        for s in segments {
            v.extend_from_slice(s);
        }
        v.extend_from_slice(&[0xFF, 0xD9]);
        v
    }

    #[test]
    fn reads_baseline_frame_header() {
        let buf = jpeg(&[app0(), sof(0xC0, 800, 600)]);
        assert_eq!(
            probe(&buf),
            Ok(ImageDimensions {
                width: 800,
                height: 600
            })
        );
    }

    #[test]
    fn reads_progressive_frame_header() {
        let buf = jpeg(&[sof(0xC2, 1654, 2339)]);
        let frame = probe_frame(&buf).unwrap();
        assert_eq!((frame.width, frame.height), (1654, 2339));
        assert_eq!(frame.precision, 8);
        assert_eq!(frame.components, Some(3));
    }

    #[test]
    fn skips_huffman_table_marker() {
        // C4 sits inside the SOF range but is a DHT segment.
        let dht = vec![0xFF, 0xC4, 0x00, 0x05, 0x00, 0x01, 0x02];
        let buf = jpeg(&[dht, sof(0xC1, 10, 20)]);
        assert_eq!(probe(&buf).unwrap(), ImageDimensions { width: 10, height: 20 });
    }

    #[test]
    fn skips_standalone_and_fill_bytes() {
        let mut buf = SOI.to_vec();
        buf.extend_from_slice(&[0xFF, 0x01]); // TEM
        buf.extend_from_slice(&[0xFF, 0xFF, 0xFF]); // fill
        buf.extend_from_slice(&sof(0xC0, 3, 4)[1..]);
        assert_eq!(probe(&buf).unwrap(), ImageDimensions { width: 3, height: 4 });
    }

    #[test]
    fn rejects_non_jpeg() {
        let png = b"\x89PNG\r\n\x1a\n";
        assert!(matches!(
            probe(png),
            Err(ProbeError::NotSupportedFormat { .. })
        ));
        assert!(matches!(probe(&[]), Err(ProbeError::NotSupportedFormat { .. })));
    }

    #[test]
    fn missing_frame_header_is_malformed() {
        let buf = jpeg(&[app0()]);
        assert!(matches!(probe(&buf), Err(ProbeError::MalformedImage { .. })));
    }

    #[test]
    fn scan_before_frame_is_malformed() {
        let sos = vec![0xFF, 0xDA, 0x00, 0x08, 0x01, 0x01, 0x00, 0x00, 0x3F, 0x00];
        let buf = jpeg(&[sos]);
        assert!(matches!(probe(&buf), Err(ProbeError::MalformedImage { .. })));
    }

    #[test]
    fn non_marker_byte_is_malformed() {
        let mut buf = SOI.to_vec();
        buf.extend_from_slice(&[0x12, 0x34]);
        assert!(matches!(
            probe(&buf),
            Err(ProbeError::MalformedImage { offset: 2, .. })
        ));
    }

    #[test]
    fn invalid_marker_code_is_malformed() {
        let mut buf = SOI.to_vec();
        buf.extend_from_slice(&[0xFF, 0x00, 0x00, 0x04]);
        assert!(matches!(probe(&buf), Err(ProbeError::MalformedImage { .. })));
    }

    #[test]
    fn oversized_segment_is_truncated() {
        let mut buf = SOI.to_vec();
        buf.extend_from_slice(&[0xFF, 0xE1, 0x01, 0x00, 0xAA, 0xBB]);
        assert_eq!(
            probe(&buf),
            Err(ProbeError::TruncatedInput {
                offset: 4,
                declared: 256,
                remaining: 4
            })
        );
    }

    #[test]
    fn cut_frame_header_is_truncated() {
        let full = jpeg(&[app0(), sof(0xC0, 800, 600)]);
        let cut = &full[..full.len() - 12];
        assert!(matches!(probe(cut), Err(ProbeError::TruncatedInput { .. })));
    }

    #[test]
    fn length_field_cut_is_truncated() {
        let mut buf = SOI.to_vec();
        buf.extend_from_slice(&[0xFF, 0xE0, 0x00]);
        assert!(matches!(probe(&buf), Err(ProbeError::TruncatedInput { .. })));
    }

    #[test]
    fn zero_width_is_malformed() {
        let buf = jpeg(&[sof(0xC0, 0, 600)]);
        assert!(matches!(probe(&buf), Err(ProbeError::MalformedImage { .. })));
    }

    #[test]
    fn short_frame_header_is_malformed() {
        let mut buf = SOI.to_vec();
        buf.extend_from_slice(&[0xFF, 0xC0, 0x00, 0x04, 0x08, 0x00]);
        assert!(matches!(probe(&buf), Err(ProbeError::MalformedImage { .. })));
    }

    #[test]
    fn every_prefix_fails_cleanly() {
        let full = jpeg(&[app0(), sof(0xC0, 640, 480)]);
        let header_end = 2 + app0().len() + sof(0xC0, 640, 480).len();
        for cut in 0..header_end {
            assert!(probe(&full[..cut]).is_err(), "prefix {cut} should fail");
        }
        assert!(probe(&full[..header_end]).is_ok());
    }
}
