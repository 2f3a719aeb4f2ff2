//! Answer prompt rendering.
//!
//! The user prompt is a Handlebars template fed with the query and the
//! numbered sources. Rendering never escapes HTML; sources are plain text.

use handlebars::Handlebars;
use serde::Serialize;
use sift_core::{AppError, AppResult, Query, Source};

/// Maximum characters of source content placed in the prompt per source.
const MAX_SOURCE_CHARS: usize = 2000;

const ANSWER_TEMPLATE: &str = "\
{{#if sources}}Web search results:

{{#each sources}}[Source {{this.number}}] {{this.title}} ({{this.url}})
{{this.content}}

{{/each}}{{else}}No web sources were found for this query. Answer from general knowledge and say that no sources were available.

{{/if}}Query: {{query}}";

/// Default system prompt for answer generation.
pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You are a research assistant that answers questions using web search results.

Instructions:
- Answer the query directly and concisely
- Ground every claim in the provided sources when they are relevant
- Cite sources inline as [Source N] when you use them
- If the sources disagree or do not answer the query, say so
- Do not invent URLs or facts that are not in the sources";

#[derive(Serialize)]
struct PromptSource<'a> {
    number: usize,
    url: &'a str,
    title: &'a str,
    content: String,
}

#[derive(Serialize)]
struct PromptContext<'a> {
    query: &'a str,
    sources: Vec<PromptSource<'a>>,
}

/// Renders the user prompt for a query and its ranked sources.
pub struct AnswerPrompt {
    registry: Handlebars<'static>,
}

impl AnswerPrompt {
    pub fn new() -> AppResult<Self> {
        Self::with_template(ANSWER_TEMPLATE)
    }

    /// Use a custom template. Available variables: `query`, and `sources`
    /// with `number`, `url`, `title`, `content` per entry.
    pub fn with_template(template: &str) -> AppResult<Self> {
        let mut registry = Handlebars::new();
        registry.register_escape_fn(handlebars::no_escape);
        registry
            .register_template_string("answer", template)
            .map_err(|e| AppError::Config(format!("Failed to register answer template: {}", e)))?;

        Ok(Self { registry })
    }

    pub fn render(&self, query: &Query, sources: &[Source]) -> AppResult<String> {
        let context = PromptContext {
            query: query.as_str(),
            sources: sources
                .iter()
                .enumerate()
                .map(|(i, s)| PromptSource {
                    number: i + 1,
                    url: &s.url,
                    title: &s.title,
                    content: truncate(&s.content, MAX_SOURCE_CHARS),
                })
                .collect(),
        };

        self.registry
            .render("answer", &context)
            .map_err(|e| AppError::Other(format!("Failed to render answer prompt: {}", e)))
    }
}

/// Truncate to at most `max_chars` characters, preferring a word boundary.
fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        None => text.to_string(),
        Some((cut, _)) => {
            let head = &text[..cut];
            match head.rfind(char::is_whitespace) {
                Some(space) if space > 0 => format!("{}...", &head[..space]),
                _ => format!("{}...", head),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(text: &str) -> Query {
        Query::parse(text).unwrap()
    }

    #[test]
    fn test_render_numbers_sources_in_order() {
        let prompt = AnswerPrompt::new().unwrap();
        let sources = vec![
            Source::new("https://a.example", "A", "Paris is the capital of France."),
            Source::new("https://b.example", "B", "France is in Europe."),
        ];

        let rendered = prompt.render(&query("capital of France"), &sources).unwrap();

        let first = rendered.find("[Source 1] A (https://a.example)").unwrap();
        let second = rendered.find("[Source 2] B (https://b.example)").unwrap();
        assert!(first < second);
        assert!(rendered.ends_with("Query: capital of France"));
        assert!(!rendered.contains("No web sources"));
    }

    #[test]
    fn test_render_without_sources() {
        let prompt = AnswerPrompt::new().unwrap();
        let rendered = prompt.render(&query("anything"), &[]).unwrap();

        assert!(rendered.starts_with("No web sources were found"));
        assert!(rendered.contains("Query: anything"));
    }

    #[test]
    fn test_render_does_not_escape() {
        let prompt = AnswerPrompt::new().unwrap();
        let sources = vec![Source::new("https://x.example/?a=1&b=2", "<T>", "x < y")];
        let rendered = prompt.render(&query("q"), &sources).unwrap();

        assert!(rendered.contains("https://x.example/?a=1&b=2"));
        assert!(rendered.contains("<T>"));
        assert!(rendered.contains("x < y"));
    }

    #[test]
    fn test_custom_template() {
        let prompt = AnswerPrompt::with_template("{{query}}|{{#each sources}}{{this.url}};{{/each}}")
            .unwrap();
        let sources = vec![Source::new("u1", "t", "c"), Source::new("u2", "t", "c")];
        assert_eq!(prompt.render(&query("q"), &sources).unwrap(), "q|u1;u2;");
    }

    #[test]
    fn test_invalid_template() {
        assert!(matches!(
            AnswerPrompt::with_template("{{#each sources}"),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 100), "short");

        let result = truncate("one two three four", 9);
        assert_eq!(result, "one two...");

        let result = truncate("ééééé", 2);
        assert_eq!(result, "éé...");
    }
}
