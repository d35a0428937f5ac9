//! Adapter from an `edgequake_llm` chat provider to [`GenerativeModel`].

use super::{GenerationRequest, GenerationResponse, GenerativeModel};
use crate::config::AnalysisConfig;
use crate::error::GapExamError;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider};
use std::sync::Arc;
use tracing::debug;

/// Runs the analysis request through a chat completion API.
///
/// Chat APIs have no portable structured-output field, so the schema is
/// appended to the system prompt and the reply is parsed like any other.
pub struct ProviderModel {
    provider: Arc<dyn LLMProvider>,
    temperature: Option<f32>,
    max_tokens: usize,
}

impl ProviderModel {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &AnalysisConfig) -> Self {
        Self {
            provider,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    fn options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: self.temperature,
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        }
    }
}

fn system_text(request: &GenerationRequest) -> String {
    let schema = serde_json::to_string_pretty(&request.response_schema)
        .unwrap_or_else(|_| request.response_schema.to_string());
    format!(
        "{}\n\nReply with a single JSON object matching this OpenAPI schema:\n{}",
        request.prompt, schema
    )
}

fn build_messages(request: &GenerationRequest) -> Vec<ChatMessage> {
    let images: Vec<ImageData> = request
        .images
        .iter()
        .map(|img| ImageData::new(img.data.clone(), img.mime_type.clone()).with_detail("high"))
        .collect();
    vec![
        ChatMessage::system(system_text(request)),
        ChatMessage::user_with_images("", images),
    ]
}

#[async_trait]
impl GenerativeModel for ProviderModel {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, GapExamError> {
        let messages = build_messages(request);
        let response = self
            .provider
            .chat(&messages, Some(&self.options()))
            .await
            .map_err(|e| GapExamError::Transport {
                provider: self.provider.name().to_string(),
                message: e.to_string(),
            })?;

        debug!(
            "{}: {} input tokens, {} output tokens",
            self.provider.name(),
            response.prompt_tokens,
            response.completion_tokens
        );

        Ok(GenerationResponse {
            text: Some(response.content).filter(|t| !t.is_empty()),
            input_tokens: response.prompt_tokens,
            output_tokens: response.completion_tokens,
        })
    }

    fn name(&self) -> &str {
        self.provider.name()
    }
}
