//! # gapexam
//!
//! Find the curriculum gaps in a student's math exercises and generate a
//! targeted exam paper for them, using a multimodal model.
//!
//! A tutor or parent selects a few PDFs of completed exercises and a
//! school grade. The pages are rasterised and sent, together with the
//! grade's syllabus context, to a generative model in a single request. The
//! model answers with a coverage analysis (covered and missing knowledge
//! points, a short summary) and a fresh 100-point exam paper focused on the
//! missing points.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDFs + grade
//!  │
//!  ├─ 1. Input     read local files or download URLs, check %PDF magic
//!  ├─ 2. Ingest    rasterise ≤ 5 pages per document, ≤ 15 images overall
//!  │               (pdfium at 1.5×, JPEG q80, base64; spawn_blocking)
//!  ├─ 3. Prompt    grade-specific instructions + versioned JSON schema
//!  ├─ 4. Analyse   one structured-output call (Gemini or any edgequake provider)
//!  └─ 5. Output    AnalysisResult → printable exam, answer key, dashboard, JSON
//! ```
//!
//! [`Session`] ties the stages together behind a small state machine
//! (`Idle → Ingesting → Analyzing → Done | Failed`) with a busy guard,
//! cancellation and reset.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gapexam::{AnalysisConfig, GradeLevel, Session, SourceDocument};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Gemini is used when GEMINI_API_KEY is set.
//!     let config = AnalysisConfig::default();
//!     let session = Session::new(&config)?;
//!
//!     session.select_documents(vec![SourceDocument::from_path("week3.pdf").await?])?;
//!     session.set_grade("p5-1".parse::<GradeLevel>()?);
//!
//!     let result = session.run().await?;
//!     println!("missing: {:?}", result.analysis.missing_points);
//!     println!("{}", gapexam::render_exam(&result.exam, gapexam::ExamView::Print));
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `gapexam` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! gapexam = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analysis;
pub mod config;
pub mod error;
pub mod grade;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod provider;
pub mod schema;
pub mod session;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analysis::AnalysisClient;
pub use config::{AnalysisConfig, AnalysisConfigBuilder, ShapePolicy};
pub use error::{ErrorKind, GapExamError};
pub use grade::{GradeLevel, SchoolYear, Term};
pub use model::{
    AnalysisResult, ExamPaper, ExamSections, KnowledgeAnalysis, PageImage, Question, QuestionKind,
};
pub use output::{render_analysis, render_exam, render_json, write_atomic, ExamView};
pub use pipeline::ingest::ingest_documents;
pub use pipeline::input::SourceDocument;
pub use pipeline::render::{PdfiumRasterizer, Rasterizer, RenderSettings};
pub use progress::{NoopObserver, ObserverHandle, SessionObserver};
pub use provider::{
    resolve_model, GeminiModel, GenerationRequest, GenerationResponse, GenerativeModel,
    InlineImage, ProviderModel,
};
pub use schema::ExamBlueprint;
pub use session::{Session, SessionState};
