//! Text-generation integration for Odes.
//!
//! This crate provides a provider-agnostic abstraction over generation
//! endpoints and the streaming session that consumes them.
//!
//! # Providers
//! - **Ollama**: any endpoint speaking the `/api/generate` protocol (default)
//!
//! # Example
//! ```no_run
//! use odes_llm::{LlmRequest, OllamaClient, StreamSession};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() {
//! let client = OllamaClient::new();
//! let request = LlmRequest::new("Hello, world!", "mistral").with_streaming();
//! let outcome = StreamSession::new(CancellationToken::new())
//!     .run(&client, &request)
//!     .await;
//! println!("{:?}: {}", outcome.state, outcome.answer);
//! # }
//! ```

pub mod client;
pub mod decoder;
pub mod factory;
pub mod providers;
pub mod session;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmStream, LlmStreamChunk};
pub use decoder::NdjsonDecoder;
pub use factory::create_client;
pub use providers::OllamaClient;
pub use session::{SessionOutcome, SessionState, StreamSession};
