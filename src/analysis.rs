//! The analysis client: one structured-output call per run.
//!
//! ```text
//! [PageImage] + GradeLevel
//!     │ prompts::analysis_prompt, schema::response_schema
//!     ▼
//! GenerationRequest ──▶ GenerativeModel::generate   (bounded by timeout)
//!     │ text
//!     ▼
//! strip fences ─▶ serde_json ─▶ AnalysisResult ─▶ blueprint check
//! ```
//!
//! The client makes exactly one call and never retries. Images are sent in
//! batch order, after the prompt text.

use crate::config::{AnalysisConfig, ShapePolicy};
use crate::error::GapExamError;
use crate::grade::GradeLevel;
use crate::model::{AnalysisResult, PageImage};
use crate::prompts::analysis_prompt;
use crate::provider::{GenerationRequest, GenerativeModel, InlineImage};
use crate::schema::{response_schema, ExamBlueprint, SCHEMA_VERSION};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

static RE_JSON_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^\s*```(?:json|JSON)?\s*\n(.*?)\n?```\s*$").unwrap());

/// Sends page images to a [`GenerativeModel`] and decodes the answer.
#[derive(Clone)]
pub struct AnalysisClient {
    model: Arc<dyn GenerativeModel>,
    timeout: Duration,
    thinking_budget: Option<u32>,
    shape_policy: ShapePolicy,
}

impl AnalysisClient {
    pub fn new(model: Arc<dyn GenerativeModel>, config: &AnalysisConfig) -> Self {
        Self {
            model,
            timeout: Duration::from_secs(config.request_timeout_secs),
            thinking_budget: config.thinking_budget,
            shape_policy: config.shape_policy,
        }
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// The request [`Self::analyze`] would send.
    pub fn build_request(&self, images: &[PageImage], grade: &GradeLevel) -> GenerationRequest {
        GenerationRequest {
            prompt: analysis_prompt(grade),
            images: images.iter().map(InlineImage::from).collect(),
            response_schema: response_schema().clone(),
            thinking_budget: self.thinking_budget,
        }
    }

    /// Analyse `images` against the syllabus of `grade`.
    pub async fn analyze(
        &self,
        images: &[PageImage],
        grade: &GradeLevel,
    ) -> Result<AnalysisResult, GapExamError> {
        let request = self.build_request(images, grade);
        let start = Instant::now();
        info!(
            "Sending {} images to '{}' for {} (schema {})",
            images.len(),
            self.model.name(),
            grade,
            SCHEMA_VERSION
        );

        let response = tokio::time::timeout(self.timeout, self.model.generate(&request))
            .await
            .map_err(|_| GapExamError::ApiTimeout {
                secs: self.timeout.as_secs(),
            })??;

        info!(
            "Model answered in {:?} ({} input tokens, {} output tokens)",
            start.elapsed(),
            response.input_tokens,
            response.output_tokens
        );

        let text = response
            .text
            .filter(|t| !t.trim().is_empty())
            .ok_or(GapExamError::EmptyResponse)?;

        let result = parse_result(&text)?;
        self.check_shape(&result)?;
        Ok(result)
    }

    fn check_shape(&self, result: &AnalysisResult) -> Result<(), GapExamError> {
        let deviations = ExamBlueprint::STANDARD.deviations(&result.exam);
        if deviations.is_empty() {
            return Ok(());
        }
        match self.shape_policy {
            ShapePolicy::Warn => {
                for d in &deviations {
                    warn!("Generated exam: {}", d);
                }
                Ok(())
            }
            ShapePolicy::Reject => Err(GapExamError::ExamShape { deviations }),
        }
    }
}

/// Decode the model's text into an [`AnalysisResult`].
///
/// A single surrounding ```` ```json ```` fence is tolerated; anything else
/// that is not the JSON object fails with the raw text attached.
pub fn parse_result(text: &str) -> Result<AnalysisResult, GapExamError> {
    let body = match RE_JSON_FENCE.captures(text) {
        Some(caps) => {
            debug!("Stripping markdown fence from model output");
            caps.get(1).map_or(text, |m| m.as_str())
        }
        None => text,
    };
    serde_json::from_str(body.trim()).map_err(|e| GapExamError::MalformedResponse {
        detail: e.to_string(),
        raw: text.to_string(),
    })
}
