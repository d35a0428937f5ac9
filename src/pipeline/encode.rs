//! Image encoding: `DynamicImage` → base64 JPEG.
//!
//! Pages are sent as JPEG at a fixed quality rather than PNG: a run can
//! carry up to fifteen pages in a single request, and JPEG keeps that request
//! small while printed exercise text stays legible at quality 80.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use tracing::debug;

/// Encode a rasterised page as base64 JPEG text (no data-URI prefix).
///
/// The alpha channel is dropped first; JPEG has no transparency and pdfium
/// renders pages onto an opaque white background anyway.
pub fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<String, image::ImageError> {
    let rgb = img.to_rgb8();
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality).encode_image(&rgb)?;

    let b64 = STANDARD.encode(&buf);
    debug!(
        "Encoded {}x{} page → {} bytes JPEG, {} bytes base64",
        rgb.width(),
        rgb.height(),
        buf.len(),
        b64.len()
    );

    Ok(b64)
}
