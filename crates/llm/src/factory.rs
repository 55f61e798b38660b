//! Generation client factory.
//!
//! Resolves a provider name and endpoint from configuration into a shared
//! client handle.

use crate::client::LlmClient;
use crate::providers::OllamaClient;
use odes_core::{AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Create a generation client based on the provider name.
///
/// # Arguments
/// * `provider` - Provider identifier (currently only "ollama")
/// * `endpoint` - Optional custom generate URL
///
/// # Errors
/// Returns error if the provider is unknown or the client cannot be built.
pub fn create_client(provider: &str, endpoint: Option<&str>) -> AppResult<Arc<dyn LlmClient>> {
    match provider.to_lowercase().as_str() {
        "ollama" => {
            let endpoint = endpoint.unwrap_or(crate::providers::ollama::DEFAULT_GENERATE_URL);
            let client = OllamaClient::with_connect_timeout(endpoint, CONNECT_TIMEOUT)?;
            Ok(Arc::new(client))
        }
        _ => Err(AppError::Config(format!("Unknown provider: {}", provider))),
    }
}
