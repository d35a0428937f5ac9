//! Native client for the Generative Language API (`generateContent`).

use super::{GenerationRequest, GenerationResponse, GenerativeModel};
use crate::error::GapExamError;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tracing::debug;

const PROVIDER: &str = "gemini";

/// Gemini backend using `responseMimeType: application/json` and
/// `responseSchema` for structured output.
pub struct GeminiModel {
    api_key: String,
    model: String,
    base_url: String,
    temperature: Option<f32>,
    client: Client,
}

impl GeminiModel {
    /// `base_url` is the API root, e.g. `https://generativelanguage.googleapis.com`.
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: &str,
    ) -> Result<Self, GapExamError> {
        let client = Client::builder()
            .build()
            .map_err(|e| GapExamError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self {
            api_key: api_key.into().trim().to_string(),
            model: model.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            temperature: None,
            client,
        })
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    fn request_body(&self, request: &GenerationRequest) -> Value {
        // Text part first, then the pages in batch order.
        let mut parts = vec![json!({ "text": request.prompt })];
        parts.extend(request.images.iter().map(|img| {
            json!({
                "inlineData": { "mimeType": img.mime_type, "data": img.data }
            })
        }));

        let mut generation_config = json!({
            "responseMimeType": "application/json",
            "responseSchema": request.response_schema,
        });
        if let Some(budget) = request.thinking_budget {
            generation_config["thinkingConfig"] = json!({ "thinkingBudget": budget });
        }
        if let Some(t) = self.temperature {
            generation_config["temperature"] = json!(t);
        }

        json!({
            "contents": [{ "role": "user", "parts": parts }],
            "generationConfig": generation_config,
        })
    }
}

/// Join the non-thought text parts of the first candidate.
fn extract_text(body: &Value) -> Option<String> {
    let parts = body["candidates"]
        .as_array()?
        .first()?
        .get("content")?
        .get("parts")?
        .as_array()?;
    let text: String = parts
        .iter()
        .filter(|p| !p["thought"].as_bool().unwrap_or(false))
        .filter_map(|p| p["text"].as_str())
        .collect();
    (!text.is_empty()).then_some(text)
}

fn api_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.chars().take(500).collect())
}

#[async_trait]
impl GenerativeModel for GeminiModel {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, GapExamError> {
        debug!(
            "POST {} ({} images, thinking budget {:?})",
            self.endpoint(),
            request.images.len(),
            request.thinking_budget
        );

        let resp = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&self.request_body(request))
            .send()
            .await
            .map_err(|e| GapExamError::Transport {
                provider: PROVIDER.into(),
                message: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let message = api_error_message(&text);
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GapExamError::AuthError {
                    provider: PROVIDER.into(),
                    detail: message,
                },
                _ => GapExamError::Transport {
                    provider: PROVIDER.into(),
                    message: format!("HTTP {}: {}", status.as_u16(), message),
                },
            });
        }

        let body: Value = resp.json().await.map_err(|e| GapExamError::Transport {
            provider: PROVIDER.into(),
            message: format!("unreadable response body: {e}"),
        })?;

        let usage = &body["usageMetadata"];
        Ok(GenerationResponse {
            text: extract_text(&body),
            input_tokens: usage["promptTokenCount"].as_u64().unwrap_or(0) as usize,
            output_tokens: usage["candidatesTokenCount"].as_u64().unwrap_or(0) as usize,
        })
    }

    fn name(&self) -> &str {
        PROVIDER
    }
}
