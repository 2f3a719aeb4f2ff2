//! Answer generation from a query and its ranked sources.
//!
//! The generator owns fault classification for the model call: anything that
//! goes wrong before the first fragment is `GenerationFailed`, anything after
//! is a single trailing `MidStreamGeneration` item.

use crate::client::{LlmClient, LlmRequest};
use crate::prompt::{AnswerPrompt, DEFAULT_SYSTEM_PROMPT};
use futures::{future, stream, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use sift_core::config::LlmSettings;
use sift_core::{AppError, AppResult, Query, Source};
use std::pin::Pin;
use std::sync::Arc;

/// Lazily produced answer fragments.
pub type FragmentStream = Pin<Box<dyn Stream<Item = AppResult<String>> + Send>>;

/// Aggregate-mode answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    pub model: String,
}

#[async_trait::async_trait]
pub trait AnswerGenerator: Send + Sync {
    /// Start streaming an answer. Errors here are always `GenerationFailed`.
    async fn generate_stream(&self, query: &Query, sources: &[Source]) -> AppResult<FragmentStream>;

    /// Produce the whole answer at once.
    async fn generate(&self, query: &Query, sources: &[Source]) -> AppResult<Answer>;
}

/// Generation parameters taken from configuration.
#[derive(Debug, Clone)]
pub struct GenerationOptions {
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub system_prompt: String,
}

impl From<&LlmSettings> for GenerationOptions {
    fn from(settings: &LlmSettings) -> Self {
        Self {
            model: settings.model_name().to_string(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            system_prompt: settings
                .system_prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
        }
    }
}

/// Answer generator backed by an [`LlmClient`].
pub struct LlmAnswerGenerator {
    client: Arc<dyn LlmClient>,
    prompt: AnswerPrompt,
    options: GenerationOptions,
}

impl LlmAnswerGenerator {
    pub fn new(client: Arc<dyn LlmClient>, options: GenerationOptions) -> AppResult<Self> {
        Ok(Self {
            client,
            prompt: AnswerPrompt::new()?,
            options,
        })
    }

    fn build_request(&self, query: &Query, sources: &[Source]) -> AppResult<LlmRequest> {
        let prompt = self
            .prompt
            .render(query, sources)
            .map_err(|e| AppError::GenerationFailed(reason(e)))?;

        let mut request =
            LlmRequest::new(prompt, &self.options.model).with_system(&self.options.system_prompt);
        if let Some(temperature) = self.options.temperature {
            request = request.with_temperature(temperature);
        }
        if let Some(max_tokens) = self.options.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }
        Ok(request)
    }
}

/// Error text without the variant prefix, so re-wrapping does not stack them.
fn reason(error: AppError) -> String {
    match error {
        AppError::Llm(msg)
        | AppError::GenerationFailed(msg)
        | AppError::MidStreamGeneration(msg)
        | AppError::Other(msg) => msg,
        other => other.to_string(),
    }
}

#[async_trait::async_trait]
impl AnswerGenerator for LlmAnswerGenerator {
    async fn generate_stream(&self, query: &Query, sources: &[Source]) -> AppResult<FragmentStream> {
        let request = self.build_request(query, sources)?.with_streaming();

        tracing::debug!(
            provider = self.client.provider_name(),
            model = %request.model,
            sources = sources.len(),
            "Starting answer stream"
        );

        let chunks = self
            .client
            .stream(&request)
            .await
            .map_err(|e| AppError::GenerationFailed(reason(e)))?;

        let mut fragments = chunks
            .map(|chunk| chunk.map(|c| c.content))
            .filter(|item| future::ready(!matches!(item, Ok(text) if text.is_empty())));

        // The first fragment decides between a failed start and a live stream.
        let first = match fragments.next().await {
            Some(Ok(text)) => text,
            Some(Err(e)) => return Err(AppError::GenerationFailed(reason(e))),
            None => return Ok(Box::pin(stream::empty())),
        };

        let rest = fragments.scan(false, |failed, item| {
            if *failed {
                return future::ready(None);
            }
            let item = item.map_err(|e| {
                *failed = true;
                AppError::MidStreamGeneration(reason(e))
            });
            future::ready(Some(item))
        });

        Ok(Box::pin(stream::once(future::ready(Ok(first))).chain(rest)))
    }

    async fn generate(&self, query: &Query, sources: &[Source]) -> AppResult<Answer> {
        let request = self.build_request(query, sources)?;

        tracing::debug!(
            provider = self.client.provider_name(),
            model = %request.model,
            sources = sources.len(),
            "Generating answer"
        );

        let response = self
            .client
            .complete(&request)
            .await
            .map_err(|e| AppError::GenerationFailed(reason(e)))?;

        let model = if response.model.is_empty() {
            request.model
        } else {
            response.model
        };

        Ok(Answer {
            text: response.content,
            model,
        })
    }
}
