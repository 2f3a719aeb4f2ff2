//! Wire messages for the chat endpoints.

use serde::{Deserialize, Serialize};
use sift_core::Source;

/// Server → client WebSocket message.
///
/// Serialized as `{"type": "search_result", "data": [...]}` or
/// `{"type": "content", "data": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    SearchResult(Vec<Source>),
    Content(String),
}

/// Client → server WebSocket message. `query` is optional on the wire so
/// that a missing field can be reported as an invalid query.
#[derive(Debug, Deserialize)]
pub struct QueryMessage {
    #[serde(default)]
    pub query: Option<String>,
}

/// Body of `POST /chat`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub query: String,
}

/// Response of `POST /chat`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub answer: String,
    pub sources: Vec<Source>,
}
