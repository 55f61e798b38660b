//! Core types for evidence retrieval.

use odes_core::Collection;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Request body for `POST {rag_url}/query`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub collection: String,
    pub query: String,
    pub n_results: u32,
}

/// Response body of the retrieval service. Matches stay raw so one bad
/// entry does not discard its siblings.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryResponse {
    pub matches: Vec<Value>,
}

/// One retrieved passage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub text: String,

    /// Vector distance; lower is more relevant
    #[serde(default)]
    pub distance: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MatchMetadata>,
}

/// Attribution attached to a match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchMetadata {
    /// Source document filename
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Page number, sent either as a number or a numeric string
    #[serde(
        default,
        deserialize_with = "lenient_page",
        skip_serializing_if = "Option::is_none"
    )]
    pub page: Option<u32>,

    /// Everything else the service attaches (type, court, chunk_index, ...)
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

fn lenient_page<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

impl Match {
    pub fn new(text: impl Into<String>, distance: f64) -> Self {
        Self {
            text: text.into(),
            distance,
            metadata: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>, page: Option<u32>) -> Self {
        self.metadata = Some(MatchMetadata {
            source: Some(source.into()),
            page,
            extra: BTreeMap::new(),
        });
        self
    }
}

/// Result of querying one collection. A failed query is an empty outcome
/// carrying the reason; it is never an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SourceOutcome {
    pub matches: Vec<Match>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl SourceOutcome {
    pub fn found(matches: Vec<Match>) -> Self {
        Self {
            matches,
            failure: None,
        }
    }

    pub fn degraded(reason: impl Into<String>) -> Self {
        Self {
            matches: Vec::new(),
            failure: Some(reason.into()),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.failure.is_some()
    }
}

/// A source outcome paired with the collection it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionOutcome {
    pub collection: Collection,
    pub outcome: SourceOutcome,
}
