//! Search → rank → generate, shared by both chat endpoints.

use crate::protocol::ChatResponse;
use sift_core::{AppConfig, AppResult, Query, Source};
use sift_llm::{create_generator, AnswerGenerator, FragmentStream};
use sift_search::{create_gateway, create_ranker, SearchGateway, SourceRanker};
use std::sync::Arc;

/// The three injected collaborators of a chat request.
#[derive(Clone)]
pub struct Pipeline {
    search: Arc<dyn SearchGateway>,
    ranker: Arc<dyn SourceRanker>,
    generator: Arc<dyn AnswerGenerator>,
}

impl Pipeline {
    pub fn new(
        search: Arc<dyn SearchGateway>,
        ranker: Arc<dyn SourceRanker>,
        generator: Arc<dyn AnswerGenerator>,
    ) -> Self {
        Self {
            search,
            ranker,
            generator,
        }
    }

    /// Build every provider from configuration.
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        let search = create_gateway(&config.search)?;
        let ranker = create_ranker(&config.ranking)?;
        let generator = create_generator(&config.llm)?;

        tracing::info!(
            search = search.provider_name(),
            ranker = ranker.name(),
            llm = %config.llm.provider,
            model = config.llm.model_name(),
            "Pipeline ready"
        );

        Ok(Self::new(search, ranker, generator))
    }

    pub async fn search(&self, query: &Query) -> AppResult<Vec<Source>> {
        let sources = self.search.search(query).await?;
        tracing::debug!(
            count = sources.len(),
            urls = ?sources.iter().map(|s| s.url.as_str()).collect::<Vec<_>>(),
            "Search results"
        );
        Ok(sources)
    }

    pub async fn rank(&self, query: &Query, sources: Vec<Source>) -> Vec<Source> {
        let ranked = self.ranker.rank(query, sources).await;
        tracing::debug!(
            ranker = self.ranker.name(),
            urls = ?ranked.iter().map(|s| s.url.as_str()).collect::<Vec<_>>(),
            "Ranked sources"
        );
        ranked
    }

    /// Search then rank.
    pub async fn retrieve(&self, query: &Query) -> AppResult<Vec<Source>> {
        let sources = self.search(query).await?;
        Ok(self.rank(query, sources).await)
    }

    pub async fn stream_answer(
        &self,
        query: &Query,
        sources: &[Source],
    ) -> AppResult<FragmentStream> {
        self.generator.generate_stream(query, sources).await
    }

    /// Aggregate mode: answer generated from, and returned with, the ranked
    /// sources.
    pub async fn answer(&self, query: &Query) -> AppResult<ChatResponse> {
        let sources = self.retrieve(query).await?;
        let answer = self.generator.generate(query, &sources).await?;
        tracing::debug!(model = %answer.model, chars = answer.text.len(), "Answer generated");

        Ok(ChatResponse {
            answer: answer.text,
            sources,
        })
    }
}
