//! Generation client abstraction and request/response types.
//!
//! This module defines the core abstractions for talking to a text-generation
//! endpoint.

use futures::Stream;
use odes_core::AppResult;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

/// Generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRequest {
    /// The prompt text to send to the model
    pub prompt: String,

    /// Model identifier (e.g., "mistral", "llama3")
    pub model: String,

    /// Request an incremental response
    #[serde(default)]
    pub stream: bool,
}

impl LlmRequest {
    /// Create a new non-streaming request.
    pub fn new(prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: model.into(),
            stream: false,
        }
    }

    /// Enable streaming for this request.
    pub fn with_streaming(mut self) -> Self {
        self.stream = true;
        self
    }
}

/// Complete (non-streaming) response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    /// The generated text
    pub content: String,

    /// Model that generated the response
    pub model: String,

    /// Whether the response was complete
    #[serde(default = "default_true")]
    pub done: bool,
}

fn default_true() -> bool {
    true
}

/// One decoded fragment of a streaming response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmStreamChunk {
    /// Incremental text content
    pub content: String,

    /// Whether this is the final fragment
    #[serde(default)]
    pub done: bool,
}

impl LlmStreamChunk {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            done: false,
        }
    }

    pub fn last(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            done: true,
        }
    }
}

/// Stream of decoded fragments.
///
/// An `Err(AppError::ChunkDecode(_))` item marks one malformed fragment; the
/// stream continues after it. Any other error ends the exchange.
pub type LlmStream = Pin<Box<dyn Stream<Item = AppResult<LlmStreamChunk>> + Send>>;

/// Trait for generation endpoints.
///
/// A non-success initial response must be reported as
/// `AppError::LlmStatus` from `complete`/`stream` before any content is
/// produced.
#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    /// Get the provider name (e.g., "ollama").
    fn provider_name(&self) -> &str;

    /// Perform a non-streaming completion.
    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse>;

    /// Perform a streaming completion.
    ///
    /// # Returns
    /// A stream of response fragments
    async fn stream(&self, request: &LlmRequest) -> AppResult<LlmStream>;
}
