//! Search gateway trait and factory.

use crate::providers::TavilySearch;
use sift_core::config::SearchConfig;
use sift_core::{AppConfig, AppError, AppResult, Query, Source};
use std::sync::Arc;

/// A web-search backend.
///
/// Returns zero or more sources in provider order. An empty result is
/// `Ok(vec![])`; any provider failure is `AppError::SearchUnavailable`.
/// Implementations do not retry.
#[async_trait::async_trait]
pub trait SearchGateway: Send + Sync {
    /// Provider identifier (e.g., "tavily").
    fn provider_name(&self) -> &str;

    async fn search(&self, query: &Query) -> AppResult<Vec<Source>>;
}

/// Create the configured search gateway.
///
/// # Errors
/// `AppError::Config` when the provider is unknown or its API key is missing.
pub fn create_gateway(config: &SearchConfig) -> AppResult<Arc<dyn SearchGateway>> {
    match config.provider.to_lowercase().as_str() {
        "tavily" => {
            let api_key = AppConfig::resolve_api_key(&config.api_key_env)?;
            tracing::debug!(endpoint = %config.endpoint, "Creating Tavily search gateway");
            Ok(Arc::new(TavilySearch::from_config(config, api_key)?))
        }
        other => Err(AppError::Config(format!(
            "Unknown search provider: {}",
            other
        ))),
    }
}
