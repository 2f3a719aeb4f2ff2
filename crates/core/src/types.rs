//! Shared data model: the caller's query and the sources found for it.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{AppError, AppResult};

/// A caller-supplied question. Never empty once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query(String);

impl Query {
    /// Parse raw caller input, trimming surrounding whitespace.
    ///
    /// Blank input is rejected with [`AppError::InvalidQuery`].
    pub fn parse(raw: &str) -> AppResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(AppError::InvalidQuery("query must not be empty".to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Query {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// One search result considered as evidence for an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    /// Page URL; doubles as the source identifier
    pub url: String,

    /// Page title
    pub title: String,

    /// Snippet or extracted page content
    pub content: String,

    /// Relevance score reported by the search provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,

    /// Publication date as reported by the provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,
}

impl Source {
    /// Create a source with the required fields.
    pub fn new(url: impl Into<String>, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            content: content.into(),
            score: None,
            published_date: None,
        }
    }

    /// Set the provider relevance score.
    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }

    /// Set the publication date.
    pub fn with_published_date(mut self, date: impl Into<String>) -> Self {
        self.published_date = Some(date.into());
        self
    }

    /// Title and content joined, used as ranking input.
    pub fn text(&self) -> String {
        format!("{}\n{}", self.title, self.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_trims_input() {
        let query = Query::parse("  capital of France \n").unwrap();
        assert_eq!(query.as_str(), "capital of France");
        assert_eq!(query.to_string(), "capital of France");
    }

    #[test]
    fn test_blank_query_rejected() {
        assert!(matches!(Query::parse(""), Err(AppError::InvalidQuery(_))));
        assert!(matches!(Query::parse(" \t "), Err(AppError::InvalidQuery(_))));
    }

    #[test]
    fn test_source_json_shape() {
        let source = Source::new("https://a.example", "A", "alpha");
        let json = serde_json::to_value(&source).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"url": "https://a.example", "title": "A", "content": "alpha"})
        );

        let scored = source.with_score(0.5).with_published_date("2024-01-02");
        let json = serde_json::to_value(&scored).unwrap();
        assert_eq!(json["score"], 0.5);
        assert_eq!(json["published_date"], "2024-01-02");
    }

    #[test]
    fn test_source_text_includes_title_and_content() {
        let source = Source::new("u", "Paris", "capital city");
        assert_eq!(source.text(), "Paris\ncapital city");
    }
}
