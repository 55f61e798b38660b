//! Error types for the Odes assistant.
//!
//! This module defines a unified error enum that covers all error categories
//! in the pipeline: configuration, I/O, retrieval, generation, prompt
//! rendering, and document downloads.

use thiserror::Error;

/// Unified error type for the Odes assistant.
///
/// All fallible functions return `Result<T, AppError>`.
/// We never panic — errors must be represented and propagated.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Evidence retrieval errors (one collection or the whole fan-out)
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    /// Generation endpoint errors (transport, protocol)
    #[error("LLM error: {0}")]
    Llm(String),

    /// The generation endpoint answered with a non-success status before
    /// any content was streamed.
    #[error("LLM API error ({status}): {body}")]
    LlmStatus { status: u16, body: String },

    /// A single stream fragment could not be decoded.
    #[error("Failed to decode stream chunk: {0}")]
    ChunkDecode(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Document download errors
    #[error("Download of '{filename}' failed: {reason}")]
    Download { filename: String, reason: String },

    /// Caller-side precondition violations (empty inputs, etc.)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            AppError::LlmStatus { status, .. } => Some(*status),
            _ => None,
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
