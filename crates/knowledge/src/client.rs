//! Evidence source client for the retrieval service.

use crate::types::{Match, QueryRequest, QueryResponse, SourceOutcome};
use async_trait::async_trait;
use odes_core::collections::MAX_RESULTS_PER_COLLECTION;
use odes_core::{AppConfig, AppError, AppResult};
use std::time::Duration;

/// A queryable store of evidence, partitioned into collections.
#[async_trait]
pub trait EvidenceSource: Send + Sync {
    /// Perform one retrieval call. Implementations report every failure.
    async fn fetch(&self, collection: &str, query: &str, n_results: u32) -> AppResult<Vec<Match>>;

    /// Extra attempts after a failed fetch.
    fn max_retries(&self) -> u32 {
        0
    }

    /// Query one collection, degrading any failure to an empty outcome.
    async fn query(&self, collection: &str, query: &str, n_results: u32) -> SourceOutcome {
        let n_results = n_results.min(MAX_RESULTS_PER_COLLECTION);
        let attempts = self.max_retries() + 1;

        tracing::debug!(collection, n_results, "Querying collection");

        let mut last_error = String::new();
        for attempt in 1..=attempts {
            match self.fetch(collection, query, n_results).await {
                Ok(matches) => {
                    tracing::debug!(collection, matches = matches.len(), "Collection answered");
                    return SourceOutcome::found(matches);
                }
                Err(e) => {
                    tracing::debug!(collection, attempt, "Retrieval attempt failed: {}", e);
                    last_error = e.to_string();
                }
            }
        }

        tracing::warn!(collection, "Degrading to empty evidence: {}", last_error);
        SourceOutcome::degraded(last_error)
    }
}

/// HTTP client for `POST {rag_url}/query`.
pub struct HttpEvidenceClient {
    base_url: String,
    client: reqwest::Client,
    max_retries: u32,
}

impl HttpEvidenceClient {
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        max_retries: u32,
    ) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Retrieval(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            max_retries,
        })
    }

    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        Self::new(
            config.rag_url.clone(),
            Duration::from_secs(config.retrieval.request_timeout_secs),
            config.retrieval.max_retries,
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl EvidenceSource for HttpEvidenceClient {
    async fn fetch(&self, collection: &str, query: &str, n_results: u32) -> AppResult<Vec<Match>> {
        let body = QueryRequest {
            collection: collection.to_string(),
            query: query.to_string(),
            n_results,
        };

        let response = self
            .client
            .post(format!("{}/query", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Retrieval(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Retrieval(format!(
                "Retrieval service returned {}",
                status
            )));
        }

        let text = response
            .text()
            .await
            .map_err(|e| AppError::Retrieval(format!("Failed to read response: {}", e)))?;

        parse_matches(collection, &text)
    }

    fn max_retries(&self) -> u32 {
        self.max_retries
    }
}

/// Parse an untrusted query response. A body without a `matches` list is an
/// error; individual malformed matches are dropped.
pub(crate) fn parse_matches(collection: &str, body: &str) -> AppResult<Vec<Match>> {
    let response: QueryResponse = serde_json::from_str(body)
        .map_err(|e| AppError::Retrieval(format!("Malformed query response: {}", e)))?;

    let mut matches = Vec::with_capacity(response.matches.len());
    for raw in response.matches {
        match serde_json::from_value::<Match>(raw) {
            Ok(m) => matches.push(m),
            Err(e) => tracing::warn!(collection, "Dropping malformed match: {}", e),
        }
    }
    Ok(matches)
}
