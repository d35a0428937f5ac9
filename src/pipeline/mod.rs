//! Ingestion stages: from a user-supplied PDF to model-ready page images.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ encode          (per document)
//!              └──────────▶ ingest     (per batch, global cap)
//! ```
//!
//! 1. [`input`]  read a path or download a URL into a [`input::SourceDocument`]
//! 2. [`render`] rasterise the first pages; blocking, pdfium is not async
//! 3. [`encode`] JPEG-encode and base64-wrap one page
//! 4. [`ingest`] run the rasterizer over a batch in order under the image cap

pub mod encode;
pub mod ingest;
pub mod input;
pub mod render;
