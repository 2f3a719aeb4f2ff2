//! Source ranking.
//!
//! Every ranker returns a permutation of its input: the same sources,
//! reordered by descending relevance, ties kept in input order. Ranking
//! never fails; a ranker that cannot score keeps the input order.

use crate::embeddings::{cosine_similarity, create_provider, EmbeddingProvider};
use sift_core::config::RankingConfig;
use sift_core::{AppError, AppResult, Query, Source};
use std::collections::HashSet;
use std::sync::Arc;

const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "did", "do", "does", "for", "from",
    "has", "have", "how", "in", "is", "it", "its", "of", "on", "or", "that", "the", "their",
    "this", "to", "was", "were", "what", "when", "where", "which", "who", "why", "with",
];

pub(crate) fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.contains(&word)
}

/// Reorders sources by relevance to a query.
#[async_trait::async_trait]
pub trait SourceRanker: Send + Sync {
    /// Strategy name (e.g., "lexical").
    fn name(&self) -> &str;

    async fn rank(&self, query: &Query, sources: Vec<Source>) -> Vec<Source>;
}

/// Stable descending sort of `sources` by `scores`.
///
/// NaN scores sort last. If the lengths differ the input order is kept.
pub fn order_by_scores(sources: Vec<Source>, scores: &[f64]) -> Vec<Source> {
    if sources.len() != scores.len() {
        tracing::warn!(
            sources = sources.len(),
            scores = scores.len(),
            "Score count mismatch, keeping input order"
        );
        return sources;
    }

    let keys: Vec<f64> = scores
        .iter()
        .map(|s| if s.is_nan() { f64::NEG_INFINITY } else { *s })
        .collect();

    let mut indexed: Vec<(usize, Source)> = sources.into_iter().enumerate().collect();
    indexed.sort_by(|(a, _), (b, _)| keys[*b].total_cmp(&keys[*a]));
    indexed.into_iter().map(|(_, source)| source).collect()
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty() && !is_stop_word(w))
        .map(str::to_string)
        .collect()
}

/// Keeps provider order.
#[derive(Debug, Default)]
pub struct PassthroughRanker;

#[async_trait::async_trait]
impl SourceRanker for PassthroughRanker {
    fn name(&self) -> &str {
        "none"
    }

    async fn rank(&self, _query: &Query, sources: Vec<Source>) -> Vec<Source> {
        sources
    }
}

/// Term-overlap heuristic; title hits count double.
#[derive(Debug, Default)]
pub struct LexicalRanker;

impl LexicalRanker {
    pub fn score(&self, terms: &HashSet<String>, source: &Source) -> f64 {
        let hits = |text: &str| {
            tokenize(text)
                .iter()
                .filter(|token| terms.contains(*token))
                .count() as f64
        };
        2.0 * hits(&source.title) + hits(&source.content)
    }
}

#[async_trait::async_trait]
impl SourceRanker for LexicalRanker {
    fn name(&self) -> &str {
        "lexical"
    }

    async fn rank(&self, query: &Query, sources: Vec<Source>) -> Vec<Source> {
        let terms: HashSet<String> = tokenize(query.as_str()).into_iter().collect();
        if terms.is_empty() || sources.len() < 2 {
            return sources;
        }

        let scores: Vec<f64> = sources.iter().map(|s| self.score(&terms, s)).collect();
        tracing::trace!(?scores, "Lexical scores");
        order_by_scores(sources, &scores)
    }
}

/// Cosine similarity between query and source embeddings.
pub struct EmbeddingRanker {
    provider: Arc<dyn EmbeddingProvider>,
}

impl EmbeddingRanker {
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self { provider }
    }

    async fn scores(&self, query: &Query, sources: &[Source]) -> AppResult<Vec<f64>> {
        let mut texts = Vec::with_capacity(sources.len() + 1);
        texts.push(query.as_str().to_string());
        texts.extend(sources.iter().map(Source::text));

        let embeddings = self.provider.embed_batch(&texts).await?;
        let Some((query_vec, source_vecs)) = embeddings.split_first() else {
            return Err(AppError::Other("No query embedding returned".to_string()));
        };

        if source_vecs.len() != sources.len() {
            return Err(AppError::Other(format!(
                "Expected {} source embeddings, got {}",
                sources.len(),
                source_vecs.len()
            )));
        }
        if let Some(bad) = source_vecs.iter().find(|v| v.len() != query_vec.len()) {
            return Err(AppError::Other(format!(
                "Embedding dimension mismatch: query {} vs source {}",
                query_vec.len(),
                bad.len()
            )));
        }

        Ok(source_vecs
            .iter()
            .map(|v| cosine_similarity(query_vec, v))
            .collect())
    }
}

#[async_trait::async_trait]
impl SourceRanker for EmbeddingRanker {
    fn name(&self) -> &str {
        "embedding"
    }

    async fn rank(&self, query: &Query, sources: Vec<Source>) -> Vec<Source> {
        if sources.len() < 2 {
            return sources;
        }

        match self.scores(query, &sources).await {
            Ok(scores) => order_by_scores(sources, &scores),
            Err(e) => {
                tracing::warn!(
                    provider = self.provider.provider_name(),
                    error = %e,
                    "Embedding ranking failed, keeping input order"
                );
                sources
            }
        }
    }
}

/// Create the ranker selected by `ranking.strategy`.
pub fn create_ranker(config: &RankingConfig) -> AppResult<Arc<dyn SourceRanker>> {
    match config.strategy.as_str() {
        "lexical" => Ok(Arc::new(LexicalRanker)),
        "embedding" => {
            let provider = create_provider(config)?;
            tracing::debug!(
                provider = provider.provider_name(),
                model = provider.model_name(),
                "Using embedding ranker"
            );
            Ok(Arc::new(EmbeddingRanker::new(provider)))
        }
        "none" => Ok(Arc::new(PassthroughRanker)),
        other => Err(AppError::Config(format!(
            "Unknown ranking strategy: {}",
            other
        ))),
    }
}
