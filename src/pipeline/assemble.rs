//! PDF assembly: one JPEG per page, bytes copied verbatim.
//!
//! ## Why DCTDecode passthrough?
//!
//! PDF can carry a JPEG stream as-is under the `DCTDecode` filter, so the
//! page images never get decoded or re-encoded. Output quality equals input
//! quality and assembly cost is dominated by file I/O.
//!
//! ## Geometry
//!
//! Every page gets the same MediaBox, the job's page size, at 1 px = 1 pt.
//! Each image is drawn at its own pixel size anchored at the top-left
//! corner: no scaling, cropping or centring. A page whose image differs from
//! the first page's geometry is therefore padded or clipped, not resized.

use crate::error::Flyer2PdfError;
use crate::pipeline::probe::{probe_frame, FrameHeader, ImageDimensions};
use lopdf::{dictionary, Document, Object, Stream};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// The only sample precision PDF allows for `DCTDecode` images.
const DCT_BITS_PER_COMPONENT: u8 = 8;

/// What [`assemble`] wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblySummary {
    pub pages_written: usize,
    pub bytes_written: u64,
}

/// Write `images` in order into a PDF at `output_path`, one page each.
///
/// The document is saved to `<output>.tmp` and renamed into place, so a
/// failed run never leaves a truncated PDF behind.
///
/// # Errors
/// [`Flyer2PdfError::AssemblyFailed`] if an image cannot be read, is not
/// an 8-bit JPEG, or the output cannot be written.
pub fn assemble(
    output_path: &Path,
    images: &[PathBuf],
    page_size: ImageDimensions,
    title: Option<&str>,
) -> Result<AssemblySummary, Flyer2PdfError> {
    let fail = |detail: String| Flyer2PdfError::AssemblyFailed {
        path: output_path.to_path_buf(),
        detail,
    };

    if images.is_empty() {
        return Err(fail("no images to assemble".into()));
    }

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids: Vec<Object> = Vec::with_capacity(images.len());

    for (i, image_path) in images.iter().enumerate() {
        let bytes = std::fs::read(image_path)
            .map_err(|e| fail(format!("cannot read '{}': {e}", image_path.display())))?;
        let frame = probe_frame(&bytes)
            .map_err(|e| fail(format!("'{}': {e}", image_path.display())))?;
        if frame.precision != DCT_BITS_PER_COMPONENT {
            return Err(fail(format!(
                "'{}': {}-bit JPEG; PDF DCTDecode images must be 8-bit",
                image_path.display(),
                frame.precision
            )));
        }
        if frame.width != page_size.width || frame.height != page_size.height {
            warn!(
                "Page {} is {}x{}, page size is {}x{}; drawing unscaled",
                i + 1,
                frame.width,
                frame.height,
                page_size.width,
                page_size.height
            );
        }

        let name = format!("Im{}", i + 1);
        let image_id = doc.add_object(image_xobject(&frame, bytes));
        let content = draw_image_content(&name, &frame, page_size);
        let content_id = doc.add_object(Stream::new(dictionary! {}, content));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! {
                    name.as_str() => image_id,
                },
            },
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(page_size.width as i64),
                Object::Integer(page_size.height as i64),
            ],
        });
        kids.push(Object::Reference(page_id));
        debug!("Added page {} from {}", i + 1, image_path.display());
    }

    let count = kids.len();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count as i64,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut info_dict = dictionary! {
        "Producer" => Object::string_literal(concat!("flyer2pdf ", env!("CARGO_PKG_VERSION"))),
    };
    if let Some(t) = title {
        info_dict.set("Title", Object::string_literal(t));
    }
    let info_id = doc.add_object(info_dict);
    doc.trailer.set("Info", info_id);

    // Content streams only; image streams are already DCT-compressed.
    doc.compress();

    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| fail(format!("cannot create '{}': {e}", parent.display())))?;
    }

    let tmp_path = tmp_path_for(output_path);
    doc.save(&tmp_path)
        .map_err(|e| fail(format!("cannot write '{}': {e}", tmp_path.display())))?;
    std::fs::rename(&tmp_path, output_path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp_path);
        fail(format!("cannot move into place: {e}"))
    })?;

    let bytes_written = std::fs::metadata(output_path).map(|m| m.len()).unwrap_or(0);
    info!(
        "Wrote {} pages to {} ({} bytes)",
        count,
        output_path.display(),
        bytes_written
    );

    Ok(AssemblySummary {
        pages_written: count,
        bytes_written,
    })
}

/// Async wrapper: runs [`assemble`] on the blocking pool.
pub async fn assemble_document(
    output_path: &Path,
    images: &[PathBuf],
    page_size: ImageDimensions,
    title: Option<&str>,
) -> Result<AssemblySummary, Flyer2PdfError> {
    let output = output_path.to_path_buf();
    let images = images.to_vec();
    let title = title.map(str::to_owned);

    tokio::task::spawn_blocking(move || assemble(&output, &images, page_size, title.as_deref()))
        .await
        .map_err(|e| Flyer2PdfError::Internal(format!("Assembly task panicked: {e}")))?
}

fn tmp_path_for(output_path: &Path) -> PathBuf {
    let mut tmp = output_path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

fn color_space(components: Option<u8>) -> &'static str {
    match components {
        Some(1) => "DeviceGray",
        Some(4) => "DeviceCMYK",
        _ => "DeviceRGB",
    }
}

fn image_xobject(frame: &FrameHeader, jpeg: Vec<u8>) -> Stream {
    let mut dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => frame.width as i64,
        "Height" => frame.height as i64,
        "ColorSpace" => color_space(frame.components),
        "BitsPerComponent" => DCT_BITS_PER_COMPONENT as i64,
        "Filter" => "DCTDecode",
    };
    if frame.components == Some(4) {
        // Adobe CMYK JPEGs are stored inverted.
        dict.set(
            "Decode",
            [1, 0, 1, 0, 1, 0, 1, 0]
                .iter()
                .map(|&v| Object::Integer(v))
                .collect::<Vec<_>>(),
        );
    }
    // The JPEG is already compressed; keep lopdf from deflating it again.
    Stream::new(dict, jpeg).with_compression(false)
}

/// `q w 0 0 h x y cm /ImN Do Q` with the image's top edge on the page's.
fn draw_image_content(name: &str, frame: &FrameHeader, page_size: ImageDimensions) -> Vec<u8> {
    let y = page_size.height as i64 - frame.height as i64;
    format!(
        "q {} 0 0 {} 0 {} cm /{} Do Q\n",
        frame.width, frame.height, y, name
    )
    .into_bytes()
}
