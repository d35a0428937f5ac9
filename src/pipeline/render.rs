//! PDF rasterisation: render the first pages of a document to JPEG via pdfium.
//!
//! ## Why a trait?
//!
//! The batch ingestor only needs "document in, ordered page images out".
//! [`Rasterizer`] is that seam; [`PdfiumRasterizer`] is the production
//! implementation and tests drive the ingestor with fakes.
//!
//! ## Blocking
//!
//! `rasterize` is CPU-bound and synchronous. Pages are rendered one after
//! another onto a fresh bitmap each; callers in async code run it inside
//! `tokio::task::spawn_blocking` (see [`crate::pipeline::ingest`]).

use crate::config::AnalysisConfig;
use crate::error::GapExamError;
use crate::model::PageImage;
use crate::pipeline::encode::encode_jpeg;
use crate::pipeline::input::SourceDocument;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Converts one document into its ordered page images.
pub trait Rasterizer: Send + Sync {
    /// Rasterise the leading pages of `document`, in page order.
    ///
    /// The returned images carry their page number; document and batch
    /// positions are filled in by the ingestor.
    fn rasterize(&self, document: &SourceDocument) -> Result<Vec<PageImage>, GapExamError>;
}

/// Render settings taken from [`AnalysisConfig`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderSettings {
    pub scale: f32,
    pub jpeg_quality: u8,
    pub max_rendered_pixels: u32,
    pub page_limit: usize,
}

impl From<&AnalysisConfig> for RenderSettings {
    fn from(config: &AnalysisConfig) -> Self {
        Self {
            scale: config.render_scale,
            jpeg_quality: config.jpeg_quality,
            max_rendered_pixels: config.max_rendered_pixels,
            page_limit: config.page_limit_per_doc,
        }
    }
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self::from(&AnalysisConfig::default())
    }
}

/// Number of leading pages to render for a document of `total` pages.
pub fn pages_to_render(total: usize, limit: usize) -> usize {
    total.min(limit)
}

/// Pixel size for a page of `width_pt` × `height_pt` points.
///
/// Scales by `scale`, then shrinks proportionally so the longest edge does
/// not exceed `max_pixels`. Never returns a zero dimension.
pub fn target_size(width_pt: f32, height_pt: f32, scale: f32, max_pixels: u32) -> (i32, i32) {
    let mut w = width_pt * scale;
    let mut h = height_pt * scale;
    let longest = w.max(h);
    if longest > max_pixels as f32 {
        let shrink = max_pixels as f32 / longest;
        w *= shrink;
        h *= shrink;
    }
    ((w.round() as i32).max(1), (h.round() as i32).max(1))
}

/// pdfium-backed [`Rasterizer`].
///
/// Binds to the pdfium library once, on construction.
pub struct PdfiumRasterizer {
    pdfium: Pdfium,
    settings: RenderSettings,
}

impl PdfiumRasterizer {
    /// Bind to pdfium, searching `library_dir` first, then `./`, then the
    /// system library path.
    pub fn new(settings: RenderSettings, library_dir: Option<&Path>) -> Result<Self, GapExamError> {
        let pdfium = bind_pdfium(library_dir)?;
        Ok(Self { pdfium, settings })
    }

    /// Build from an [`AnalysisConfig`].
    pub fn from_config(config: &AnalysisConfig) -> Result<Self, GapExamError> {
        Self::new(
            RenderSettings::from(config),
            config.pdfium_library_dir.as_deref(),
        )
    }
}

impl Rasterizer for PdfiumRasterizer {
    fn rasterize(&self, document: &SourceDocument) -> Result<Vec<PageImage>, GapExamError> {
        let name = document.name();
        let pdf = self
            .pdfium
            .load_pdf_from_byte_slice(document.bytes(), None)
            .map_err(|e| {
                let detail = format!("{:?}", e);
                GapExamError::DocumentParse {
                    document: name.to_string(),
                    detail: if detail.contains("Password") || detail.contains("password") {
                        "document is password-protected".to_string()
                    } else {
                        detail
                    },
                }
            })?;

        let pages = pdf.pages();
        let total_pages = pages.len() as usize;
        let count = pages_to_render(total_pages, self.settings.page_limit);
        info!(
            "'{}': {} pages, rendering {}",
            name, total_pages, count
        );

        let mut images = Vec::with_capacity(count);

        for idx in 0..count {
            let page_number = idx + 1;
            let render_failed = |e: PdfiumError| GapExamError::RasterisationFailed {
                document: name.to_string(),
                page: page_number,
                detail: format!("{:?}", e),
            };

            let page = pages.get(idx as u16).map_err(render_failed)?;

            let (width, height) = target_size(
                page.width().value,
                page.height().value,
                self.settings.scale,
                self.settings.max_rendered_pixels,
            );
            let render_config = PdfRenderConfig::new()
                .set_target_width(width)
                .set_target_height(height);

            let bitmap = page.render_with_config(&render_config).map_err(render_failed)?;
            let image = bitmap.as_image();

            let data = encode_jpeg(&image, self.settings.jpeg_quality).map_err(|e| {
                GapExamError::RasterisationFailed {
                    document: name.to_string(),
                    page: page_number,
                    detail: format!("JPEG encoding failed: {}", e),
                }
            })?;

            debug!(
                "Rendered '{}' page {} → {}x{} px",
                name,
                page_number,
                image.width(),
                image.height()
            );

            images.push(PageImage {
                page_number,
                document_index: 0,
                batch_index: idx,
                width: image.width(),
                height: image.height(),
                data,
            });
        }

        Ok(images)
    }
}

/// Bind to the pdfium shared library.
fn bind_pdfium(library_dir: Option<&Path>) -> Result<Pdfium, GapExamError> {
    let mut search: Vec<PathBuf> = Vec::new();
    if let Some(dir) = library_dir {
        search.push(dir.to_path_buf());
    }
    search.push(PathBuf::from("./"));

    for dir in &search {
        let lib_path = Pdfium::pdfium_platform_library_name_at_path(dir);
        if let Ok(bindings) = Pdfium::bind_to_library(&lib_path) {
            debug!("Bound pdfium from {}", lib_path.display());
            return Ok(Pdfium::new(bindings));
        }
    }

    Pdfium::bind_to_system_library()
        .map(Pdfium::new)
        .map_err(|e| GapExamError::PdfiumBindingFailed(format!("{:?}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_limit_caps_long_documents() {
        assert_eq!(pages_to_render(7, 5), 5);
        assert_eq!(pages_to_render(3, 5), 3);
        assert_eq!(pages_to_render(0, 5), 0);
    }

    #[test]
    fn a4_at_one_and_a_half() {
        // A4 is 595 × 842 pt.
        let (w, h) = target_size(595.0, 842.0, 1.5, 2000);
        assert_eq!((w, h), (893, 1263));
    }

    #[test]
    fn oversized_pages_are_shrunk_proportionally() {
        // A0 is 2384 × 3370 pt.
        let (w, h) = target_size(2384.0, 3370.0, 1.5, 2000);
        assert_eq!(h, 2000);
        assert!((w as f32 / h as f32 - 2384.0 / 3370.0).abs() < 0.01);
    }

    #[test]
    fn degenerate_pages_keep_one_pixel() {
        assert_eq!(target_size(0.0, 0.0, 1.5, 2000), (1, 1));
    }

    #[test]
    fn settings_follow_config() {
        let config = AnalysisConfig::builder()
            .render_scale(2.0)
            .page_limit_per_doc(3)
            .build()
            .unwrap();
        let s = RenderSettings::from(&config);
        assert_eq!(s.scale, 2.0);
        assert_eq!(s.page_limit, 3);
        assert_eq!(s.jpeg_quality, 80);
    }
}
