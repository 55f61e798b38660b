//! Odes Core Library
//!
//! This crate provides the foundational utilities shared by the Odes crates:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging infrastructure
//! - Configuration management
//! - The collection catalog

pub mod collections;
pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use collections::{Collection, CollectionCatalog};
pub use config::{AppConfig, ContextConfig, GenerationConfig, RetrievalConfig};
pub use error::{AppError, AppResult};
