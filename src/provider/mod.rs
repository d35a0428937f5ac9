//! Generative model backends.
//!
//! The analysis client talks to a [`GenerativeModel`]: one multimodal
//! request in, raw response text out. Two backends ship with the crate:
//!
//! - [`GeminiModel`]: the Generative Language REST API, with native
//!   structured output (`responseSchema`) and a thinking budget.
//! - [`ProviderModel`]: any `edgequake_llm` chat provider. The schema
//!   is sent as prompt text since those APIs have no common schema field.
//!
//! [`resolve_model`] picks one from an [`AnalysisConfig`].

mod chat;
mod gemini;

pub use chat::ProviderModel;
pub use gemini::GeminiModel;

use crate::config::{AnalysisConfig, DEFAULT_GEMINI_MODEL};
use crate::error::GapExamError;
use crate::model::PageImage;
use async_trait::async_trait;
use edgequake_llm::ProviderFactory;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Environment variable holding the Gemini API key.
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// One inline image part of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: String,
    /// Base64 payload without a `data:` prefix.
    pub data: String,
}

impl From<&PageImage> for InlineImage {
    fn from(page: &PageImage) -> Self {
        Self {
            mime_type: page.mime_type().to_string(),
            data: page.data.clone(),
        }
    }
}

/// A single structured-output request.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    /// Images in batch order.
    pub images: Vec<InlineImage>,
    pub response_schema: Value,
    pub thinking_budget: Option<u32>,
}

/// What a backend returned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationResponse {
    /// Concatenated answer text; `None` when the model produced no text part.
    pub text: Option<String>,
    pub input_tokens: usize,
    pub output_tokens: usize,
}

/// A multimodal model that answers with JSON text.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Send `request` and return the raw answer.
    async fn generate(&self, request: &GenerationRequest)
        -> Result<GenerationResponse, GapExamError>;

    /// Short backend name used in logs and errors.
    fn name(&self) -> &str;
}

/// Pick a backend for `config`, most specific first:
///
/// 1. `config.generator`, used as-is.
/// 2. `config.provider_name`: `"gemini"` builds a [`GeminiModel`], anything
///    else goes through `ProviderFactory::create_llm_provider`.
/// 3. A Gemini API key in `config.api_key` or `GEMINI_API_KEY`.
/// 4. `ProviderFactory::from_env()` auto-detection.
pub fn resolve_model(config: &AnalysisConfig) -> Result<Arc<dyn GenerativeModel>, GapExamError> {
    if let Some(ref generator) = config.generator {
        return Ok(Arc::clone(generator));
    }

    if let Some(ref name) = config.provider_name {
        if name.eq_ignore_ascii_case("gemini") {
            return gemini_from_config(config).map(|m| Arc::new(m) as Arc<dyn GenerativeModel>);
        }
        let model = config.model.as_deref().ok_or_else(|| {
            GapExamError::ProviderNotConfigured {
                provider: name.clone(),
                hint: "Pass a model name (--model) for this provider.".into(),
            }
        })?;
        let provider = ProviderFactory::create_llm_provider(name, model).map_err(|e| {
            GapExamError::ProviderNotConfigured {
                provider: name.clone(),
                hint: e.to_string(),
            }
        })?;
        debug!("Using chat provider '{}' with model '{}'", name, model);
        return Ok(Arc::new(ProviderModel::new(provider, config)));
    }

    if gemini_api_key(config).is_some() {
        return gemini_from_config(config).map(|m| Arc::new(m) as Arc<dyn GenerativeModel>);
    }

    let (provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| GapExamError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No model backend could be detected.\n\
                 Set {GEMINI_API_KEY_ENV}, or pass --provider and --model.\n\
                 Error: {e}"
            ),
        })?;
    Ok(Arc::new(ProviderModel::new(provider, config)))
}

fn gemini_api_key(config: &AnalysisConfig) -> Option<String> {
    config
        .api_key
        .clone()
        .or_else(|| std::env::var(GEMINI_API_KEY_ENV).ok())
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
}

fn gemini_from_config(config: &AnalysisConfig) -> Result<GeminiModel, GapExamError> {
    let api_key = gemini_api_key(config).ok_or_else(|| GapExamError::ProviderNotConfigured {
        provider: "gemini".into(),
        hint: format!("Set {GEMINI_API_KEY_ENV} or pass an API key."),
    })?;
    let model = config.model.as_deref().unwrap_or(DEFAULT_GEMINI_MODEL);
    let mut gemini = GeminiModel::new(api_key, model, &config.api_base_url)?;
    if let Some(t) = config.temperature {
        gemini = gemini.with_temperature(t);
    }
    debug!("Using Gemini model '{}'", gemini.model());
    Ok(gemini)
}
