//! Web search and source ranking for sift.
//!
//! - [`SearchGateway`]: fetches candidate sources for a query (Tavily)
//! - [`SourceRanker`]: reorders sources by relevance (lexical, embedding, none)
//! - [`embeddings`]: embedding providers backing the semantic ranker

pub mod embeddings;
pub mod gateway;
pub mod providers;
pub mod ranker;

pub use gateway::{create_gateway, SearchGateway};
pub use providers::TavilySearch;
pub use ranker::{
    create_ranker, order_by_scores, EmbeddingRanker, LexicalRanker, PassthroughRanker,
    SourceRanker,
};
