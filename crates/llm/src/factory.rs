//! LLM provider factory.
//!
//! Builds clients and answer generators from [`LlmSettings`], resolving the
//! endpoint and injecting secrets from the environment.

use crate::client::LlmClient;
use crate::generator::{AnswerGenerator, GenerationOptions, LlmAnswerGenerator};
use crate::providers::{gemini, ollama, GeminiClient, OllamaClient};
use sift_core::config::LlmSettings;
use sift_core::{AppConfig, AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// Create an LLM client for the configured provider.
///
/// # Errors
/// Returns `AppError::Config` if the provider is unknown or a required API
/// key is missing from the environment.
pub fn create_client(settings: &LlmSettings) -> AppResult<Arc<dyn LlmClient>> {
    let timeout = Duration::from_secs(settings.timeout_secs);

    match settings.provider.to_lowercase().as_str() {
        "ollama" => {
            let base_url = settings
                .endpoint
                .as_deref()
                .unwrap_or(ollama::DEFAULT_OLLAMA_URL);
            tracing::debug!(endpoint = base_url, "Creating Ollama client");
            Ok(Arc::new(OllamaClient::new(base_url, timeout)?))
        }
        "gemini" => {
            let env_name = settings.api_key_env_name().ok_or_else(|| {
                AppError::Config("Gemini provider requires an API key".to_string())
            })?;
            let api_key = AppConfig::resolve_api_key(env_name)?;
            let base_url = settings
                .endpoint
                .as_deref()
                .unwrap_or(gemini::DEFAULT_GEMINI_URL);
            tracing::debug!(endpoint = base_url, "Creating Gemini client");
            Ok(Arc::new(GeminiClient::new(base_url, api_key, timeout)?))
        }
        other => Err(AppError::Config(format!("Unknown LLM provider: {}", other))),
    }
}

/// Create the answer generator used by the pipeline.
pub fn create_generator(settings: &LlmSettings) -> AppResult<Arc<dyn AnswerGenerator>> {
    let client = create_client(settings)?;
    let generator = LlmAnswerGenerator::new(client, GenerationOptions::from(settings))?;
    Ok(Arc::new(generator))
}
