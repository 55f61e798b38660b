//! Knowledge collection catalog.
//!
//! The catalog is the single declarative table of collections: their order
//! (authority order, most authoritative first) and how many results each one
//! requests. Both the fan-out and the context assembler read it.

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Result count for collections that have no explicit policy.
pub const DEFAULT_RESULTS_PER_COLLECTION: u32 = 2;

/// The retrieval service never returns more than this many matches.
pub const MAX_RESULTS_PER_COLLECTION: u32 = 50;

/// One independently queryable partition of the knowledge base.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    /// Collection identifier used on the wire
    pub id: String,

    /// Human-readable name
    pub name: String,

    /// Number of matches requested per query
    #[serde(rename = "nResults", default = "default_results")]
    pub n_results: u32,
}

fn default_results() -> u32 {
    DEFAULT_RESULTS_PER_COLLECTION
}

impl Collection {
    pub fn new(id: impl Into<String>, name: impl Into<String>, n_results: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            n_results,
        }
    }
}

/// Ordered set of collections, fixed at process start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectionCatalog {
    collections: Vec<Collection>,
}

impl Default for CollectionCatalog {
    /// Legal authority order: primary legislation first, curated Q&A last.
    fn default() -> Self {
        Self {
            collections: vec![
                Collection::new("primary_legislation", "Primary Legislation", 3),
                Collection::new("secondary_legislation", "Secondary Legislation", 3),
                Collection::new("case_law", "Case Law", 3),
                Collection::new("non_statutory_rules", "Non-Statutory Rules", 3),
                Collection::new("insurance_qa", "Insurance Q&A", 1),
            ],
        }
    }
}

impl CollectionCatalog {
    /// Build a catalog from an ordered list, rejecting empty lists and duplicate ids.
    pub fn new(collections: Vec<Collection>) -> AppResult<Self> {
        let catalog = Self { collections };
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.collections.is_empty() {
            return Err(AppError::Config(
                "Collection catalog cannot be empty".to_string(),
            ));
        }

        for (i, collection) in self.collections.iter().enumerate() {
            if collection.id.trim().is_empty() {
                return Err(AppError::Config(
                    "Collection id cannot be empty".to_string(),
                ));
            }
            if self.collections[..i].iter().any(|c| c.id == collection.id) {
                return Err(AppError::Config(format!(
                    "Duplicate collection id: {}",
                    collection.id
                )));
            }
        }

        Ok(())
    }

    /// Collections in authority order.
    pub fn iter(&self) -> impl Iterator<Item = &Collection> {
        self.collections.iter()
    }

    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Collection> {
        self.collections.iter().find(|c| c.id == id)
    }

    /// Requested result count for a collection id, clamped to the service cap.
    pub fn results_for(&self, id: &str) -> u32 {
        self.get(id)
            .map(|c| c.n_results)
            .unwrap_or(DEFAULT_RESULTS_PER_COLLECTION)
            .min(MAX_RESULTS_PER_COLLECTION)
    }
}
