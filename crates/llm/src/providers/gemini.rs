//! Google Gemini provider.
//!
//! Uses the `generateContent` and `streamGenerateContent?alt=sse` endpoints
//! of the Generative Language API.

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmStream, LlmStreamChunk, LlmUsage};
use crate::lines::line_stream;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use sift_core::{AppError, AppResult};
use std::time::Duration;

/// Default Gemini API endpoint.
pub const DEFAULT_GEMINI_URL: &str = "https://generativelanguage.googleapis.com";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
    #[serde(default)]
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: GeminiContent,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

impl GeminiResponse {
    fn text(&self) -> String {
        self.candidates
            .first()
            .map(|c| c.content.parts.iter().map(|p| p.text.as_str()).collect())
            .unwrap_or_default()
    }

    fn finished(&self) -> bool {
        self.candidates
            .first()
            .and_then(|c| c.finish_reason.as_ref())
            .is_some()
    }

    fn usage(&self) -> Option<LlmUsage> {
        self.usage_metadata
            .as_ref()
            .map(|u| LlmUsage::new(u.prompt_token_count, u.candidates_token_count))
    }
}

/// Gemini LLM client.
pub struct GeminiClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl GeminiClient {
    /// Create a client for `base_url`.
    ///
    /// `timeout` bounds connecting, a whole completion, the wait for the
    /// first streamed event, and each gap between streamed chunks.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build Gemini HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
            timeout,
        })
    }

    fn to_gemini_request(request: &LlmRequest) -> GeminiRequest {
        let generation_config = (request.temperature.is_some() || request.max_tokens.is_some())
            .then(|| GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
            });

        GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart {
                    text: request.prompt.clone(),
                }],
            }],
            system_instruction: request.system.as_ref().map(|s| GeminiContent {
                role: None,
                parts: vec![GeminiPart { text: s.clone() }],
            }),
            generation_config,
        }
    }

    async fn post(
        &self,
        url: &str,
        body: &GeminiRequest,
        stream: bool,
    ) -> AppResult<reqwest::Response> {
        let request = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(body);

        // Streamed bodies are bounded per chunk by `line_stream`, not in total.
        let sent = if stream {
            tokio::time::timeout(self.timeout, request.send())
                .await
                .map_err(|_| {
                    AppError::Llm(format!("Gemini did not respond within {:?}", self.timeout))
                })?
        } else {
            request.timeout(self.timeout).send().await
        };
        let response =
            sent.map_err(|e| AppError::Llm(format!("Failed to send request to Gemini: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Llm(format!(
                "Gemini API error ({}): {}",
                status, error_text
            )));
        }

        Ok(response)
    }
}

/// Parse one SSE line. Non-data lines (comments, `event:`) yield `None`.
fn parse_sse_line(line: &str) -> Option<AppResult<LlmStreamChunk>> {
    let data = line.strip_prefix("data:")?.trim();
    if data.is_empty() || data == "[DONE]" {
        return None;
    }

    let parsed: GeminiResponse = match serde_json::from_str(data) {
        Ok(p) => p,
        Err(e) => {
            return Some(Err(AppError::Llm(format!(
                "Failed to parse Gemini event: {}",
                e
            ))))
        }
    };

    let done = parsed.finished();
    Some(Ok(LlmStreamChunk {
        content: parsed.text(),
        usage: if done { parsed.usage() } else { None },
        done,
    }))
}

#[async_trait::async_trait]
impl LlmClient for GeminiClient {
    fn provider_name(&self) -> &str {
        "gemini"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::debug!(model = %request.model, "Sending completion request to Gemini");

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, request.model
        );
        let response = self
            .post(&url, &Self::to_gemini_request(request), false)
            .await?;

        let parsed: GeminiResponse = response
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to parse Gemini response: {}", e)))?;

        if parsed.candidates.is_empty() {
            return Err(AppError::Llm("Gemini returned no candidates".to_string()));
        }

        Ok(LlmResponse {
            content: parsed.text(),
            model: parsed
                .model_version
                .clone()
                .unwrap_or_else(|| request.model.clone()),
            usage: parsed.usage().unwrap_or_default(),
        })
    }

    async fn stream(&self, request: &LlmRequest) -> AppResult<LlmStream> {
        tracing::debug!(model = %request.model, "Starting streaming request to Gemini");

        let url = format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse",
            self.base_url, request.model
        );
        let response = self
            .post(&url, &Self::to_gemini_request(request), true)
            .await?;

        let chunks = line_stream(Box::pin(response.bytes_stream()), self.timeout).filter_map(
            |line| async move {
                match line {
                    Ok(l) => parse_sse_line(&l),
                    Err(e) => Some(Err(e)),
                }
            },
        );

        Ok(Box::pin(chunks))
    }
}
