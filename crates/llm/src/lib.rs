//! LLM integration crate for sift.
//!
//! Provides a provider-agnostic [`LlmClient`] abstraction and the
//! [`AnswerGenerator`] that turns a query plus ranked sources into answer
//! fragments.
//!
//! # Providers
//! - **Ollama**: Local LLM runtime (default)
//! - **Gemini**: Google Generative Language API
//!
//! # Example
//! ```no_run
//! use sift_llm::{LlmClient, LlmRequest, providers::OllamaClient};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new("http://localhost:11434", Duration::from_secs(120))?;
//! let request = LlmRequest::new("Hello, world!", "llama3.2");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod generator;
mod lines;
pub mod prompt;
pub mod providers;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmStream, LlmStreamChunk, LlmUsage};
pub use factory::{create_client, create_generator};
pub use generator::{Answer, AnswerGenerator, FragmentStream, GenerationOptions, LlmAnswerGenerator};
pub use prompt::AnswerPrompt;
pub use providers::{GeminiClient, OllamaClient};
