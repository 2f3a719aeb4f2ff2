//! Embedding provider trait and factory.

use super::providers::{OllamaEmbeddings, TrigramEmbeddings};
use sift_core::config::RankingConfig;
use sift_core::{AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// Dimensions used by the offline trigram provider.
pub const TRIGRAM_DIMENSIONS: usize = 384;

const EMBEDDING_TIMEOUT_SECS: u64 = 30;

/// Trait for embedding providers.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "ollama", "trigram")
    fn provider_name(&self) -> &str;

    /// Get model identifier
    fn model_name(&self) -> &str;

    /// Generate embeddings for multiple texts, one vector per input in order.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;

    /// Generate embedding for a single text (convenience method).
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut results = self.embed_batch(&[text.to_string()]).await?;
        results
            .pop()
            .ok_or_else(|| AppError::Llm("No embedding returned".to_string()))
    }
}

/// Create the embedding provider named in the ranking configuration.
pub fn create_provider(config: &RankingConfig) -> AppResult<Arc<dyn EmbeddingProvider>> {
    match config.embedding_provider.as_str() {
        "ollama" => Ok(Arc::new(OllamaEmbeddings::with_timeout(
            &config.endpoint,
            &config.model,
            Duration::from_secs(EMBEDDING_TIMEOUT_SECS),
        )?)),
        "trigram" => Ok(Arc::new(TrigramEmbeddings::new(TRIGRAM_DIMENSIONS))),
        other => Err(AppError::Config(format!(
            "Unknown embedding provider: '{}'. Supported providers: ollama, trigram",
            other
        ))),
    }
}
