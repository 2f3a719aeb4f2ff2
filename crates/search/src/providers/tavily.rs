//! Tavily search provider.
//!
//! Tavily API: https://docs.tavily.com/documentation/api-reference/endpoint/search

use crate::gateway::SearchGateway;
use serde::{Deserialize, Serialize};
use sift_core::config::SearchConfig;
use sift_core::{AppError, AppResult, Query, Source};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    query: &'a str,
    search_depth: &'a str,
    max_results: u32,
    include_answer: bool,
    include_raw_content: bool,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    #[serde(default)]
    url: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    score: Option<f64>,
    #[serde(default)]
    published_date: Option<String>,
}

impl TavilyResult {
    fn into_source(self) -> Option<Source> {
        let url = self.url.trim();
        if url.is_empty() {
            return None;
        }

        Some(Source {
            url: url.to_string(),
            title: self.title,
            content: self.content,
            score: self.score,
            published_date: self.published_date,
        })
    }
}

/// Tavily web search client.
pub struct TavilySearch {
    endpoint: String,
    api_key: String,
    max_results: u32,
    search_depth: String,
    client: reqwest::Client,
}

impl TavilySearch {
    pub fn from_config(config: &SearchConfig, api_key: impl Into<String>) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build Tavily HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            max_results: config.max_results,
            search_depth: config.search_depth.clone(),
            client,
        })
    }
}

#[async_trait::async_trait]
impl SearchGateway for TavilySearch {
    fn provider_name(&self) -> &str {
        "tavily"
    }

    async fn search(&self, query: &Query) -> AppResult<Vec<Source>> {
        let url = format!("{}/search", self.endpoint);
        let body = TavilyRequest {
            query: query.as_str(),
            search_depth: &self.search_depth,
            max_results: self.max_results,
            include_answer: false,
            include_raw_content: false,
        };

        tracing::debug!(%url, max_results = self.max_results, "Sending Tavily search");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::SearchUnavailable(format!("Tavily request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::SearchUnavailable(format!(
                "Tavily API error ({}): {}",
                status, error_text
            )));
        }

        let parsed: TavilyResponse = response.json().await.map_err(|e| {
            AppError::SearchUnavailable(format!("Failed to parse Tavily response: {}", e))
        })?;

        let sources: Vec<Source> = parsed
            .results
            .into_iter()
            .filter_map(TavilyResult::into_source)
            .collect();

        tracing::debug!(count = sources.len(), "Tavily search complete");
        Ok(sources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn gateway(endpoint: String) -> TavilySearch {
        let config = SearchConfig {
            endpoint,
            max_results: 3,
            ..SearchConfig::default()
        };
        TavilySearch::from_config(&config, "tvly-test").unwrap()
    }

    fn query() -> Query {
        Query::parse("capital of France").unwrap()
    }

    #[tokio::test]
    async fn test_search_maps_results() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .and(header("authorization", "Bearer tvly-test"))
            .and(body_partial_json(serde_json::json!({
                "query": "capital of France",
                "search_depth": "basic",
                "max_results": 3,
                "include_answer": false
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "query": "capital of France",
                "results": [
                    {
                        "url": "https://en.wikipedia.org/wiki/Paris",
                        "title": "Paris",
                        "content": "Paris is the capital of France.",
                        "score": 0.98,
                        "published_date": "2024-01-01"
                    },
                    {"url": "  ", "title": "No URL", "content": "skipped"},
                    {"url": "https://example.com/france", "title": "France", "content": "A country."}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let sources = gateway(server.uri()).search(&query()).await.unwrap();

        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].url, "https://en.wikipedia.org/wiki/Paris");
        assert_eq!(sources[0].score, Some(0.98));
        assert_eq!(sources[0].published_date.as_deref(), Some("2024-01-01"));
        assert_eq!(sources[1].url, "https://example.com/france");
        assert_eq!(sources[1].score, None);
    }

    #[tokio::test]
    async fn test_empty_results_are_not_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"results": []})),
            )
            .mount(&server)
            .await;

        let sources = gateway(server.uri()).search(&query()).await.unwrap();
        assert!(sources.is_empty());
    }

    #[tokio::test]
    async fn test_http_error_is_search_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid key"))
            .mount(&server)
            .await;

        let result = gateway(server.uri()).search(&query()).await;
        assert!(matches!(result, Err(AppError::SearchUnavailable(msg)) if msg.contains("401")));
    }

    #[tokio::test]
    async fn test_malformed_body_is_search_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let result = gateway(server.uri()).search(&query()).await;
        assert!(matches!(result, Err(AppError::SearchUnavailable(_))));
    }

    #[tokio::test]
    async fn test_unreachable_is_search_unavailable() {
        let result = gateway("http://127.0.0.1:1".to_string())
            .search(&query())
            .await;
        assert!(matches!(result, Err(AppError::SearchUnavailable(_))));
    }
}
