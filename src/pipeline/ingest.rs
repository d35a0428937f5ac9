//! Batch ingestion: rasterise documents in order under a global image cap.
//!
//! Documents are processed strictly one at a time. The cap is checked after
//! every document, so once it is reached the remaining documents are never
//! handed to the rasterizer and no rendering work is wasted on pages that
//! would be thrown away.

use crate::error::GapExamError;
use crate::model::PageImage;
use crate::pipeline::input::SourceDocument;
use crate::pipeline::render::Rasterizer;
use crate::progress::SessionObserver;
use std::sync::Arc;
use tracing::{debug, info};

/// Rasterise `documents` in order and concatenate their pages.
///
/// With `image_limit = Some(n)` the result holds at most `n` images and
/// ingestion stops as soon as `n` is reached. Any document failure aborts
/// the whole batch, and so does a batch that renders no pages at all.
pub async fn ingest_documents(
    rasterizer: Arc<dyn Rasterizer>,
    documents: Vec<SourceDocument>,
    image_limit: Option<usize>,
    observer: &dyn SessionObserver,
) -> Result<Vec<PageImage>, GapExamError> {
    let total = documents.len();
    let mut images: Vec<PageImage> = Vec::new();

    for (index, document) in documents.into_iter().enumerate() {
        if let Some(limit) = image_limit {
            if images.len() >= limit {
                debug!(
                    "Image limit {} reached; skipping '{}' and {} more",
                    limit,
                    document.name(),
                    total - index - 1
                );
                break;
            }
        }

        let r = Arc::clone(&rasterizer);
        let pages = tokio::task::spawn_blocking(move || r.rasterize(&document))
            .await
            .map_err(|e| GapExamError::Internal(format!("Render task panicked: {}", e)))??;

        let before = images.len();
        for page in pages {
            let batch_index = images.len();
            images.push(page.placed(index, batch_index));
        }

        if let Some(limit) = image_limit {
            if images.len() > limit {
                info!("Truncating batch from {} to {} images", images.len(), limit);
                images.truncate(limit);
            }
        }

        observer.on_document_processed(index + 1, total, images.len() - before);
    }

    if images.is_empty() {
        return Err(GapExamError::NoPagesRendered { documents: total });
    }

    info!("Ingested {} page images from {} documents", images.len(), total);
    Ok(images)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoopObserver;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Fake rasterizer: page counts by document name, records every call.
    struct FakeRasterizer {
        pages: HashMap<String, usize>,
        page_limit: usize,
        calls: Mutex<Vec<String>>,
    }

    impl FakeRasterizer {
        fn new(docs: &[(&str, usize)]) -> Arc<Self> {
            Arc::new(Self {
                pages: docs.iter().map(|(n, p)| (n.to_string(), *p)).collect(),
                page_limit: 5,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Rasterizer for FakeRasterizer {
        fn rasterize(&self, document: &SourceDocument) -> Result<Vec<PageImage>, GapExamError> {
            self.calls.lock().unwrap().push(document.name().to_string());
            if document.name().starts_with("broken") {
                return Err(GapExamError::DocumentParse {
                    document: document.name().to_string(),
                    detail: "bad xref".into(),
                });
            }
            let n = self.pages[document.name()].min(self.page_limit);
            Ok((0..n)
                .map(|i| PageImage {
                    page_number: i + 1,
                    document_index: 0,
                    batch_index: i,
                    width: 1,
                    height: 1,
                    data: format!("{}#{}", document.name(), i + 1),
                })
                .collect())
        }
    }

    fn docs(names: &[&str]) -> Vec<SourceDocument> {
        names
            .iter()
            .map(|n| SourceDocument::from_bytes(*n, b"%PDF-1.4".to_vec()).unwrap())
            .collect()
    }

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<(usize, usize, usize)>>,
    }

    impl SessionObserver for Recorder {
        fn on_document_processed(&self, index: usize, total: usize, pages: usize) {
            self.events.lock().unwrap().push((index, total, pages));
        }
    }

    #[tokio::test]
    async fn sums_capped_page_counts_under_the_limit() {
        let r = FakeRasterizer::new(&[("a", 2), ("b", 7), ("c", 3)]);
        let images = ingest_documents(r.clone(), docs(&["a", "b", "c"]), Some(15), &NoopObserver)
            .await
            .unwrap();
        // 2 + min(7, 5) + 3
        assert_eq!(images.len(), 10);
        assert_eq!(r.calls(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn positions_are_stamped_in_batch_order() {
        let r = FakeRasterizer::new(&[("a", 2), ("b", 2)]);
        let images = ingest_documents(r, docs(&["a", "b"]), None, &NoopObserver)
            .await
            .unwrap();
        let placed: Vec<_> = images
            .iter()
            .map(|i| (i.document_index, i.page_number, i.batch_index))
            .collect();
        assert_eq!(placed, vec![(0, 1, 0), (0, 2, 1), (1, 1, 2), (1, 2, 3)]);
    }

    #[tokio::test]
    async fn truncates_to_exactly_the_limit() {
        let r = FakeRasterizer::new(&[("a", 5), ("b", 5), ("c", 5), ("d", 5)]);
        let images = ingest_documents(r.clone(), docs(&["a", "b", "c", "d"]), Some(12), &NoopObserver)
            .await
            .unwrap();
        assert_eq!(images.len(), 12);
        assert_eq!(images.last().unwrap().data, "c#2");
        // d is never rasterised once the cap is reached after c
        assert_eq!(r.calls(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn never_rasterizes_after_the_cap_is_reached() {
        let r = FakeRasterizer::new(&[("a", 5), ("b", 5), ("c", 5), ("d", 5), ("e", 5)]);
        let images = ingest_documents(
            r.clone(),
            docs(&["a", "b", "c", "d", "e"]),
            Some(15),
            &NoopObserver,
        )
        .await
        .unwrap();
        assert_eq!(images.len(), 15);
        assert_eq!(r.calls(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn unbounded_keeps_every_page() {
        let names = ["a", "b", "c", "d", "e"];
        let r = FakeRasterizer::new(&names.map(|n| (n, 9usize)));
        let images = ingest_documents(r, docs(&names), None, &NoopObserver)
            .await
            .unwrap();
        assert_eq!(images.len(), 25);
    }

    #[tokio::test]
    async fn document_failure_aborts_the_batch() {
        let r = FakeRasterizer::new(&[("a", 2), ("c", 2)]);
        let err = ingest_documents(r.clone(), docs(&["a", "broken.pdf", "c"]), Some(15), &NoopObserver)
            .await
            .unwrap_err();
        assert!(matches!(err, GapExamError::DocumentParse { .. }));
        assert_eq!(r.calls(), vec!["a", "broken.pdf"]);
    }

    #[tokio::test]
    async fn empty_documents_fail_before_the_model_call() {
        let r = FakeRasterizer::new(&[("a", 0), ("b", 0)]);
        let err = ingest_documents(r.clone(), docs(&["a", "b"]), Some(15), &NoopObserver)
            .await
            .unwrap_err();
        assert!(matches!(err, GapExamError::NoPagesRendered { documents: 2 }));
        assert_eq!(r.calls(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn reports_progress_per_document() {
        let r = FakeRasterizer::new(&[("a", 5), ("b", 5), ("c", 5), ("d", 5)]);
        let recorder = Recorder::default();
        ingest_documents(r, docs(&["a", "b", "c", "d"]), Some(12), &recorder)
            .await
            .unwrap();
        let events = recorder.events.lock().unwrap().clone();
        assert_eq!(events, vec![(1, 4, 5), (2, 4, 5), (3, 4, 2)]);
    }
}
