//! Error types for sift.
//!
//! One enum covers every failure the service can observe. The pipeline
//! variants (`SearchUnavailable`, `GenerationFailed`, `MidStreamGeneration`,
//! `PeerDisconnected`, `InvalidQuery`) drive the session fault policy; the
//! remaining variants are treated as unexpected faults.

use thiserror::Error;

/// Unified error type for sift.
///
/// All fallible functions in the workspace return `Result<T, AppError>`.
#[derive(Error, Debug)]
pub enum AppError {
    /// The web-search provider was unreachable or returned an error
    #[error("Search unavailable: {0}")]
    SearchUnavailable(String),

    /// The language model failed before producing any fragment
    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    /// The language model failed after part of the answer was delivered
    #[error("Generation interrupted: {0}")]
    MidStreamGeneration(String),

    /// The caller closed the connection
    #[error("Peer disconnected")]
    PeerDisconnected,

    /// The caller supplied no usable query
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Raw LLM provider errors, classified later by the answer generator
    #[error("LLM error: {0}")]
    Llm(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Connection-level failures that are not a clean disconnect
    #[error("Transport error: {0}")]
    Transport(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Short machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::SearchUnavailable(_) => "search_unavailable",
            Self::GenerationFailed(_) | Self::MidStreamGeneration(_) | Self::Llm(_) => {
                "generation_failed"
            }
            Self::PeerDisconnected => "peer_disconnected",
            Self::InvalidQuery(_) => "bad_request",
            Self::Config(_)
            | Self::Io(_)
            | Self::Transport(_)
            | Self::Serialization(_)
            | Self::Other(_) => "internal",
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
