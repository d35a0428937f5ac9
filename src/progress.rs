//! Observer trait for session lifecycle events.
//!
//! Inject an [`Arc<dyn SessionObserver>`] into a [`crate::session::Session`]
//! to follow a run: a terminal spinner, a channel to a web socket, a test
//! recorder. The session never knows how events are presented.
//!
//! Events for one run arrive in this order:
//!
//! ```text
//! on_started ─▶ on_document_processed × n ─▶ on_analyzing ─▶ on_succeeded
//!                                   └──────────────┴────────▶ on_failed
//! ```
//!
//! # Example
//!
//! ```rust
//! use gapexam::SessionObserver;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! struct CountingObserver {
//!     documents: AtomicUsize,
//! }
//!
//! impl SessionObserver for CountingObserver {
//!     fn on_document_processed(&self, index: usize, total: usize, pages: usize) {
//!         self.documents.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("document {index}/{total}: {pages} pages");
//!     }
//! }
//! ```

use crate::error::GapExamError;
use crate::model::AnalysisResult;
use std::sync::Arc;

/// Receives lifecycle events from a session run.
///
/// All methods have default no-op implementations so observers only
/// override what they care about.
pub trait SessionObserver: Send + Sync {
    /// A run started with `documents` selected documents.
    fn on_started(&self, documents: usize) {
        let _ = documents;
    }

    /// Document `index` (1-indexed) of `total` was rasterised into `pages` images.
    ///
    /// `pages` counts the images kept after the global cap.
    fn on_document_processed(&self, index: usize, total: usize, pages: usize) {
        let _ = (index, total, pages);
    }

    /// Ingestion finished; `images` page images are being sent to the model.
    fn on_analyzing(&self, images: usize) {
        let _ = images;
    }

    /// The run produced a result.
    fn on_succeeded(&self, result: &AnalysisResult) {
        let _ = result;
    }

    /// The run failed. Not called for validation errors, which never start a run.
    fn on_failed(&self, error: &GapExamError) {
        let _ = error;
    }
}

/// A no-op observer for callers that don't need progress events.
pub struct NoopObserver;

impl SessionObserver for NoopObserver {}

/// Convenience alias for the type stored by the session.
pub type ObserverHandle = Arc<dyn SessionObserver>;
