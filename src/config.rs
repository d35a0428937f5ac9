//! Configuration for an analysis session.
//!
//! Every knob lives in [`AnalysisConfig`], built via its
//! [`AnalysisConfigBuilder`]. Callers set only what they care about and get
//! the defaults below for the rest.

use crate::error::GapExamError;
use crate::provider::GenerativeModel;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Pages rasterised per document; later pages are dropped.
pub const PAGE_LIMIT_PER_DOC: usize = 5;

/// Images sent to the model per run, across all documents.
pub const IMAGE_LIMIT_TOTAL: usize = 15;

/// Default Gemini model used for syllabus matching.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-3-pro-preview";

/// Public Generative Language API endpoint.
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Configuration for one analysis session.
///
/// # Example
/// ```rust
/// use gapexam::AnalysisConfig;
///
/// let config = AnalysisConfig::builder()
///     .image_limit_total(Some(10))
///     .request_timeout_secs(120)
///     .build()
///     .unwrap();
/// assert_eq!(config.page_limit_per_doc, 5);
/// ```
#[derive(Clone)]
pub struct AnalysisConfig {
    /// Render scale relative to PDF points (1 pt → `render_scale` px). Default: 1.5.
    pub render_scale: f32,

    /// JPEG quality, 1–100. Default: 80.
    pub jpeg_quality: u8,

    /// Longest-edge cap in pixels applied after scaling. Default: 2000.
    ///
    /// An A0 poster at 1.5× is over 5000 px wide; the cap keeps memory and
    /// upload size bounded whatever the physical page size.
    pub max_rendered_pixels: u32,

    /// Maximum pages rasterised per document. Default: 5.
    pub page_limit_per_doc: usize,

    /// Maximum images across the whole batch. Default: `Some(15)`.
    ///
    /// `None` disables the global cap; each document is still capped by
    /// `page_limit_per_doc`.
    pub image_limit_total: Option<usize>,

    /// Backend name: `None` or `"gemini"` for the native Gemini client, any
    /// other name is handed to `edgequake_llm::ProviderFactory`.
    pub provider_name: Option<String>,

    /// Model identifier. If None, uses the backend default.
    pub model: Option<String>,

    /// Gemini API key. If None, `GEMINI_API_KEY` is read from the environment.
    pub api_key: Option<String>,

    /// Gemini API base URL. Default: the public endpoint.
    pub api_base_url: String,

    /// Reasoning budget in tokens for models that support it. Default: 4000.
    pub thinking_budget: Option<u32>,

    /// Sampling temperature. If None, uses the backend default.
    pub temperature: Option<f32>,

    /// Maximum output tokens for chat-style providers. Default: 16384.
    pub max_tokens: usize,

    /// Upper bound on the model call in seconds. Default: 300.
    pub request_timeout_secs: u64,

    /// What to do when the generated exam deviates from the blueprint. Default: Warn.
    pub shape_policy: ShapePolicy,

    /// Directory searched for libpdfium before `./` and the system library.
    pub pdfium_library_dir: Option<PathBuf>,

    /// Pre-constructed model backend. Takes precedence over every other
    /// backend setting.
    pub generator: Option<Arc<dyn GenerativeModel>>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            render_scale: 1.5,
            jpeg_quality: 80,
            max_rendered_pixels: 2000,
            page_limit_per_doc: PAGE_LIMIT_PER_DOC,
            image_limit_total: Some(IMAGE_LIMIT_TOTAL),
            provider_name: None,
            model: None,
            api_key: None,
            api_base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            thinking_budget: Some(4000),
            temperature: None,
            max_tokens: 16384,
            request_timeout_secs: 300,
            shape_policy: ShapePolicy::default(),
            pdfium_library_dir: None,
            generator: None,
        }
    }
}

impl fmt::Debug for AnalysisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisConfig")
            .field("render_scale", &self.render_scale)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("page_limit_per_doc", &self.page_limit_per_doc)
            .field("image_limit_total", &self.image_limit_total)
            .field("provider_name", &self.provider_name)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_base_url", &self.api_base_url)
            .field("thinking_budget", &self.thinking_budget)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("shape_policy", &self.shape_policy)
            .field("pdfium_library_dir", &self.pdfium_library_dir)
            .field(
                "generator",
                &self.generator.as_ref().map(|_| "<dyn GenerativeModel>"),
            )
            .finish()
    }
}

impl AnalysisConfig {
    /// Create a new builder for `AnalysisConfig`.
    pub fn builder() -> AnalysisConfigBuilder {
        AnalysisConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`AnalysisConfig`].
#[derive(Debug)]
pub struct AnalysisConfigBuilder {
    config: AnalysisConfig,
}

impl AnalysisConfigBuilder {
    pub fn render_scale(mut self, scale: f32) -> Self {
        self.config.render_scale = scale.clamp(0.5, 4.0);
        self
    }

    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.jpeg_quality = quality.clamp(1, 100);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn page_limit_per_doc(mut self, n: usize) -> Self {
        self.config.page_limit_per_doc = n;
        self
    }

    pub fn image_limit_total(mut self, limit: Option<usize>) -> Self {
        self.config.image_limit_total = limit;
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_base_url = url.into();
        self
    }

    pub fn thinking_budget(mut self, budget: Option<u32>) -> Self {
        self.config.thinking_budget = budget;
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = Some(t.clamp(0.0, 2.0));
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    pub fn shape_policy(mut self, policy: ShapePolicy) -> Self {
        self.config.shape_policy = policy;
        self
    }

    pub fn pdfium_library_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library_dir = Some(dir.into());
        self
    }

    pub fn generator(mut self, generator: Arc<dyn GenerativeModel>) -> Self {
        self.config.generator = Some(generator);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AnalysisConfig, GapExamError> {
        let c = &self.config;
        if c.page_limit_per_doc == 0 {
            return Err(GapExamError::InvalidConfig(
                "Per-document page limit must be ≥ 1".into(),
            ));
        }
        if c.image_limit_total == Some(0) {
            return Err(GapExamError::InvalidConfig(
                "Total image limit must be ≥ 1 (use None to disable it)".into(),
            ));
        }
        if c.request_timeout_secs == 0 {
            return Err(GapExamError::InvalidConfig(
                "Request timeout must be ≥ 1 second".into(),
            ));
        }
        if c.api_base_url.trim().is_empty() {
            return Err(GapExamError::InvalidConfig("API base URL is empty".into()));
        }
        Ok(self.config)
    }
}

/// Handling of generated exams that deviate from the fixed blueprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ShapePolicy {
    /// Log each deviation and return the result anyway. (default)
    #[default]
    Warn,
    /// Fail the run with [`GapExamError::ExamShape`].
    Reject,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_ingestion_limits() {
        let c = AnalysisConfig::default();
        assert_eq!(c.render_scale, 1.5);
        assert_eq!(c.jpeg_quality, 80);
        assert_eq!(c.page_limit_per_doc, 5);
        assert_eq!(c.image_limit_total, Some(15));
        assert_eq!(c.thinking_budget, Some(4000));
        assert_eq!(c.shape_policy, ShapePolicy::Warn);
    }

    #[test]
    fn builder_clamps_values() {
        let c = AnalysisConfig::builder()
            .render_scale(10.0)
            .jpeg_quality(0)
            .build()
            .unwrap();
        assert_eq!(c.render_scale, 4.0);
        assert_eq!(c.jpeg_quality, 1);
    }

    #[test]
    fn builder_rejects_zero_limits() {
        assert!(AnalysisConfig::builder().page_limit_per_doc(0).build().is_err());
        assert!(AnalysisConfig::builder()
            .image_limit_total(Some(0))
            .build()
            .is_err());
        assert!(AnalysisConfig::builder()
            .image_limit_total(None)
            .build()
            .is_ok());
        assert!(AnalysisConfig::builder()
            .request_timeout_secs(0)
            .build()
            .is_err());
    }

    #[test]
    fn debug_redacts_api_key() {
        let c = AnalysisConfig::builder().api_key("AIzaSecret").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("AIzaSecret"));
        assert!(dbg.contains("<redacted>"));
    }
}
