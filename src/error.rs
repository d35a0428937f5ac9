//! Error types for the gapexam library.
//!
//! Every failure surfaces as a [`GapExamError`]. The session controller
//! catches errors exactly once, at its boundary, and turns them into the
//! `Failed` state using [`GapExamError::user_message`]. There is no
//! page-level partial success: an analysis run either produces a complete
//! [`crate::model::AnalysisResult`] or nothing.
//!
//! [`ErrorKind`] groups the variants into the coarse taxonomy callers
//! usually branch on (validation, unreadable documents, unusable model
//! output, transport).

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the gapexam library.
#[derive(Debug, Error)]
pub enum GapExamError {
    // ── Validation ────────────────────────────────────────────────────────
    /// A run was started with no documents selected.
    #[error("No PDF selected.\nSelect at least one PDF document before starting an analysis.")]
    NoDocuments,

    /// A run was started while another run of the same session is in flight.
    #[error("An analysis is already running for this session")]
    Busy,

    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// HTTP URL was syntactically valid but the download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// The bytes were read, but they are not a PDF.
    #[error("'{name}' is not a PDF document (first bytes: {magic:?})")]
    NotAPdf { name: String, magic: Vec<u8> },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// pdfium could not open the document.
    #[error("PDF '{document}' could not be parsed: {detail}")]
    DocumentParse { document: String, detail: String },

    /// pdfium opened the document but failed on one of its pages.
    #[error("Rasterisation failed for '{document}' page {page}: {detail}")]
    RasterisationFailed {
        document: String,
        page: usize,
        detail: String,
    },

    /// Every selected document rendered to zero pages.
    #[error("No pages could be rendered from the {documents} selected PDF(s)")]
    NoPagesRendered { documents: usize },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Place libpdfium next to the binary, pass --pdfium-lib <DIR>,\n\
or install pdfium system-wide.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Model errors ──────────────────────────────────────────────────────
    /// The configured provider cannot be constructed (missing API key etc.).
    #[error("Model provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The model call failed at the network or API level.
    #[error("Model request to '{provider}' failed: {message}")]
    Transport { provider: String, message: String },

    /// The model API rejected the credential (401/403).
    #[error("Authentication error from provider '{provider}': {detail}")]
    AuthError { provider: String, detail: String },

    /// The model call did not finish within the configured timeout.
    #[error("Model request timed out after {secs}s")]
    ApiTimeout { secs: u64 },

    /// The model answered without any text payload.
    #[error("The model returned an empty response")]
    EmptyResponse,

    /// The model's text payload is not valid JSON for an analysis result.
    #[error("The model returned a malformed response: {detail}")]
    MalformedResponse { detail: String, raw: String },

    /// The generated exam does not match the fixed exam blueprint.
    #[error("The generated exam does not match the expected layout: {}", deviations.join("; "))]
    ExamShape { deviations: Vec<String> },

    // ── Run control ───────────────────────────────────────────────────────
    /// The run was cancelled or the session reset while it was in flight.
    #[error("The analysis run was cancelled")]
    Cancelled,

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification of a [`GapExamError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad request from the caller; no state change.
    Validation,
    /// A document could not be read or rasterised.
    DocumentParse,
    /// The model produced no text.
    EmptyResponse,
    /// The model produced text that is not a usable analysis result.
    MalformedResponse,
    /// Network, authentication, or timeout failure talking to the model.
    Transport,
    /// The run was abandoned.
    Cancelled,
    /// Configuration, binding, or I/O problems.
    Internal,
}

impl GapExamError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoDocuments | Self::Busy => ErrorKind::Validation,
            Self::FileNotFound { .. }
            | Self::PermissionDenied { .. }
            | Self::DownloadFailed { .. }
            | Self::NotAPdf { .. }
            | Self::DocumentParse { .. }
            | Self::RasterisationFailed { .. }
            | Self::NoPagesRendered { .. } => ErrorKind::DocumentParse,
            Self::EmptyResponse => ErrorKind::EmptyResponse,
            Self::MalformedResponse { .. } | Self::ExamShape { .. } => {
                ErrorKind::MalformedResponse
            }
            Self::Transport { .. }
            | Self::AuthError { .. }
            | Self::ApiTimeout { .. }
            | Self::ProviderNotConfigured { .. } => ErrorKind::Transport,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::PdfiumBindingFailed(_)
            | Self::OutputWriteFailed { .. }
            | Self::InvalidConfig(_)
            | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// The message a session records when a run fails with this error.
    ///
    /// Document errors carry a hint to upload fewer pages; unusable model
    /// output lists the likely causes without claiming to know which one hit.
    pub fn user_message(&self) -> String {
        match self.kind() {
            ErrorKind::DocumentParse => format!(
                "Processing failed: {self}\nTry uploading fewer or smaller PDF files."
            ),
            ErrorKind::EmptyResponse | ErrorKind::MalformedResponse => format!(
                "Processing failed: {self}\nThe model may have timed out or drifted from the \
                 expected format; try again, or upload fewer pages."
            ),
            _ => format!("Processing failed: {self}"),
        }
    }

    /// The raw model text attached to a malformed response, for diagnostics.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Self::MalformedResponse { raw, .. } => Some(raw),
            _ => None,
        }
    }
}
