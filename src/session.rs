//! The session controller: one user's document selection, grade, and
//! the lifecycle of the analysis run over them.
//!
//! ```text
//!          run()               ingest ok              model ok
//!   Idle ─────────▶ Ingesting ──────────▶ Analyzing ──────────▶ Done
//!    ▲                  │                     │
//!    │                  └──── error ──────────┴──────▶ Failed
//!    └── reset() / cancel() from any state; Done and Failed accept run()
//! ```
//!
//! A session runs at most one analysis at a time. `cancel` and `reset` bump
//! a generation counter and wake the in-flight run, which drops its work
//! and leaves the state alone. A run that finishes after its generation has
//! moved on is discarded the same way.

use crate::analysis::AnalysisClient;
use crate::config::AnalysisConfig;
use crate::error::{ErrorKind, GapExamError};
use crate::grade::GradeLevel;
use crate::model::AnalysisResult;
use crate::pipeline::ingest::ingest_documents;
use crate::pipeline::input::SourceDocument;
use crate::pipeline::render::{PdfiumRasterizer, Rasterizer};
use crate::progress::{NoopObserver, ObserverHandle};
use crate::provider::resolve_model;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;
use tracing::{info, warn};

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Ingesting,
    Analyzing,
    Done,
    Failed,
}

impl SessionState {
    pub fn is_busy(self) -> bool {
        matches!(self, SessionState::Ingesting | SessionState::Analyzing)
    }
}

#[derive(Debug)]
struct SessionInner {
    state: SessionState,
    documents: Vec<SourceDocument>,
    grade: GradeLevel,
    result: Option<AnalysisResult>,
    error: Option<String>,
    generation: u64,
}

/// An analysis session.
///
/// Cloning is cheap and every clone drives the same session, so one task
/// can `run` while another calls `cancel`.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Mutex<SessionInner>>,
    cancelled: Arc<Notify>,
    rasterizer: Arc<dyn Rasterizer>,
    client: AnalysisClient,
    image_limit: Option<usize>,
    observer: ObserverHandle,
}

impl Session {
    /// Bind pdfium and resolve the model backend from `config`.
    pub fn new(config: &AnalysisConfig) -> Result<Self, GapExamError> {
        let rasterizer = Arc::new(PdfiumRasterizer::from_config(config)?);
        let model = resolve_model(config)?;
        info!("Session using model backend '{}'", model.name());
        Ok(Self::with_parts(
            rasterizer,
            AnalysisClient::new(model, config),
            config.image_limit_total,
        ))
    }

    /// Assemble a session from explicit parts.
    pub fn with_parts(
        rasterizer: Arc<dyn Rasterizer>,
        client: AnalysisClient,
        image_limit: Option<usize>,
    ) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SessionInner {
                state: SessionState::Idle,
                documents: Vec::new(),
                grade: GradeLevel::default(),
                result: None,
                error: None,
                generation: 0,
            })),
            cancelled: Arc::new(Notify::new()),
            rasterizer,
            client,
            image_limit,
            observer: Arc::new(NoopObserver),
        }
    }

    pub fn with_observer(mut self, observer: ObserverHandle) -> Self {
        self.observer = observer;
        self
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the selected documents. Rejected while a run is in flight.
    pub fn select_documents(&self, documents: Vec<SourceDocument>) -> Result<(), GapExamError> {
        let mut inner = self.lock();
        if inner.state.is_busy() {
            return Err(GapExamError::Busy);
        }
        inner.documents = documents;
        Ok(())
    }

    /// Grade used by the next run.
    pub fn set_grade(&self, grade: GradeLevel) {
        self.lock().grade = grade;
    }

    pub fn grade(&self) -> GradeLevel {
        self.lock().grade
    }

    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    pub fn document_count(&self) -> usize {
        self.lock().documents.len()
    }

    /// Result of the last successful run, until the next run or reset.
    pub fn result(&self) -> Option<AnalysisResult> {
        self.lock().result.clone()
    }

    /// User-facing message of the last failed run.
    pub fn error(&self) -> Option<String> {
        self.lock().error.clone()
    }

    /// Run ingestion and analysis over the selected documents.
    ///
    /// Validation errors (`NoDocuments`, `Busy`) leave the state untouched.
    /// Any other error moves the session to `Failed`, except `Cancelled`
    /// which leaves it wherever `cancel` or `reset` put it.
    pub async fn run(&self) -> Result<AnalysisResult, GapExamError> {
        let (generation, documents, grade) = {
            let mut inner = self.lock();
            if inner.state.is_busy() {
                return Err(GapExamError::Busy);
            }
            if inner.documents.is_empty() {
                return Err(GapExamError::NoDocuments);
            }
            inner.generation += 1;
            inner.state = SessionState::Ingesting;
            inner.result = None;
            inner.error = None;
            (inner.generation, inner.documents.clone(), inner.grade)
        };

        info!(
            "Run {} started: {} documents, grade {}",
            generation,
            documents.len(),
            grade
        );
        self.observer.on_started(documents.len());

        let cancelled = self.cancelled.notified();
        let outcome = tokio::select! {
            outcome = self.execute(generation, documents, grade) => outcome,
            _ = cancelled => Err(GapExamError::Cancelled),
        };

        self.finish(generation, outcome)
    }

    async fn execute(
        &self,
        generation: u64,
        documents: Vec<SourceDocument>,
        grade: GradeLevel,
    ) -> Result<AnalysisResult, GapExamError> {
        let images = ingest_documents(
            Arc::clone(&self.rasterizer),
            documents,
            self.image_limit,
            &*self.observer,
        )
        .await?;

        {
            let mut inner = self.lock();
            if inner.generation != generation {
                return Err(GapExamError::Cancelled);
            }
            inner.state = SessionState::Analyzing;
        }
        self.observer.on_analyzing(images.len());

        self.client.analyze(&images, &grade).await
    }

    fn finish(
        &self,
        generation: u64,
        outcome: Result<AnalysisResult, GapExamError>,
    ) -> Result<AnalysisResult, GapExamError> {
        {
            let mut inner = self.lock();
            if inner.generation != generation {
                info!("Run {} discarded", generation);
                return Err(GapExamError::Cancelled);
            }
            match &outcome {
                Ok(result) => {
                    inner.state = SessionState::Done;
                    inner.result = Some(result.clone());
                }
                Err(e) if e.kind() == ErrorKind::Cancelled => {
                    inner.state = SessionState::Idle;
                }
                Err(e) => {
                    inner.state = SessionState::Failed;
                    inner.error = Some(e.user_message());
                }
            }
        }

        match &outcome {
            Ok(result) => {
                info!("Run {} done", generation);
                self.observer.on_succeeded(result);
            }
            Err(e) if e.kind() == ErrorKind::Cancelled => {}
            Err(e) => {
                warn!("Run {} failed: {}", generation, e);
                self.observer.on_failed(e);
            }
        }
        outcome
    }

    /// Abandon the in-flight run, if any, and return to `Idle`.
    ///
    /// Selected documents, grade and the last result are kept.
    pub fn cancel(&self) {
        let mut inner = self.lock();
        if !inner.state.is_busy() {
            return;
        }
        inner.generation += 1;
        inner.state = SessionState::Idle;
        drop(inner);
        info!("Run cancelled");
        self.cancelled.notify_waiters();
    }

    /// Discard documents, result and error, and return to `Idle`.
    ///
    /// An in-flight run is abandoned as with [`Session::cancel`].
    pub fn reset(&self) {
        let mut inner = self.lock();
        let was_busy = inner.state.is_busy();
        inner.generation += 1;
        inner.state = SessionState::Idle;
        inner.documents.clear();
        inner.result = None;
        inner.error = None;
        drop(inner);
        if was_busy {
            self.cancelled.notify_waiters();
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("Session")
            .field("state", &inner.state)
            .field("documents", &inner.documents.len())
            .field("grade", &inner.grade)
            .field("generation", &inner.generation)
            .field("model", &self.client.model_name())
            .finish()
    }
}
