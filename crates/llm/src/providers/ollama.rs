//! Ollama-compatible generation provider.
//!
//! Talks to any endpoint that speaks the Ollama `/api/generate` protocol,
//! including proxies in front of it.
//! Ollama API: https://github.com/ollama/ollama/blob/main/docs/api.md

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmStream};
use crate::decoder::{NdjsonDecoder, WireFragment};
use futures::StreamExt;
use odes_core::{AppError, AppResult};
use serde::Serialize;
use std::time::Duration;

pub const DEFAULT_GENERATE_URL: &str = "http://localhost:11434/api/generate";

/// Ollama API request format.
#[derive(Debug, Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

/// Ollama generation client.
pub struct OllamaClient {
    /// Full URL of the generate endpoint
    endpoint: String,

    /// HTTP client
    client: reqwest::Client,
}

impl OllamaClient {
    /// Create a new client for the local Ollama daemon.
    pub fn new() -> Self {
        Self::with_endpoint(DEFAULT_GENERATE_URL)
    }

    /// Create a new client for a custom generate endpoint.
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Create a client whose connection attempts give up after `connect_timeout`.
    ///
    /// No total request timeout is set: a streamed answer may legitimately
    /// run for minutes and is bounded by the session deadline instead.
    pub fn with_connect_timeout(
        endpoint: impl Into<String>,
        connect_timeout: Duration,
    ) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| AppError::Llm(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: endpoint.into(),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn to_ollama_request<'a>(&self, request: &'a LlmRequest, stream: bool) -> OllamaRequest<'a> {
        OllamaRequest {
            model: &request.model,
            prompt: &request.prompt,
            stream,
        }
    }

    async fn send(&self, request: &LlmRequest, stream: bool) -> AppResult<reqwest::Response> {
        let body = self.to_ollama_request(request, stream);

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                AppError::Llm(format!("Failed to send request to {}: {}", self.endpoint, e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::LlmStatus {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }
}

impl Default for OllamaClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl LlmClient for OllamaClient {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::info!(model = %request.model, "Sending completion request");
        tracing::debug!(prompt_chars = request.prompt.len(), "Completion request");

        let response = self.send(request, false).await?;

        // For non-streaming, the endpoint returns a single JSON object
        let fragment: WireFragment = response
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to parse completion response: {}", e)))?;

        if let Some(error) = fragment.error {
            return Err(AppError::Llm(format!("Generation failed: {}", error)));
        }

        tracing::info!(chars = fragment.response.len(), "Received completion");

        Ok(LlmResponse {
            content: fragment.response,
            model: if fragment.model.is_empty() {
                request.model.clone()
            } else {
                fragment.model
            },
            done: fragment.done,
        })
    }

    async fn stream(&self, request: &LlmRequest) -> AppResult<LlmStream> {
        tracing::info!(model = %request.model, "Starting streaming request");
        tracing::debug!(prompt_chars = request.prompt.len(), "Streaming request");

        let response = self.send(request, true).await?;
        let bytes = Box::pin(response.bytes_stream());

        // Carry the decoder across reads so fragments split between network
        // chunks are reassembled; flush the tail once the body closes.
        let stream = futures::stream::unfold(
            (bytes, NdjsonDecoder::new(), false),
            |(mut bytes, mut decoder, closed)| async move {
                if closed {
                    return None;
                }

                let items = match bytes.next().await {
                    Some(Ok(chunk)) => {
                        let items = decoder.push(&chunk);
                        return Some((futures::stream::iter(items), (bytes, decoder, false)));
                    }
                    Some(Err(e)) => vec![Err(AppError::Llm(format!("Stream error: {}", e)))],
                    None => decoder.finish().into_iter().collect(),
                };

                Some((futures::stream::iter(items), (bytes, decoder, true)))
            },
        )
        .flatten();

        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ollama_client_creation() {
        let client = OllamaClient::new();
        assert_eq!(client.provider_name(), "ollama");
        assert_eq!(client.endpoint(), DEFAULT_GENERATE_URL);
    }

    #[test]
    fn test_ollama_request_serialization() {
        let client = OllamaClient::with_endpoint("http://localhost:8080/api/generate");
        let request = LlmRequest::new("Hello", "mistral").with_streaming();

        let body =
            serde_json::to_value(client.to_ollama_request(&request, request.stream)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"model": "mistral", "prompt": "Hello", "stream": true})
        );
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_llm_error() {
        let client = OllamaClient::with_connect_timeout(
            "http://127.0.0.1:9/api/generate",
            Duration::from_millis(200),
        )
        .unwrap();
        let request = LlmRequest::new("Hello", "mistral").with_streaming();

        match client.stream(&request).await {
            Err(AppError::Llm(_)) => {}
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("expected connection failure"),
        }
    }
}
