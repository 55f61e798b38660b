//! Concurrent fan-out of one query across every configured collection.

use crate::client::EvidenceSource;
use crate::types::{CollectionOutcome, SourceOutcome};
use odes_core::{AppError, AppResult, CollectionCatalog};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::task::AbortOnDropHandle;

/// Query every collection in the catalog concurrently and wait for all of
/// them to settle.
///
/// Outcomes come back in catalog order. A collection that fails, or whose
/// task panics, yields an empty outcome without affecting the others. Only
/// exceeding `deadline` fails the fan-out as a whole. Dropping the returned
/// future aborts the outstanding queries.
pub async fn fan_out(
    source: Arc<dyn EvidenceSource>,
    catalog: &CollectionCatalog,
    query: &str,
    deadline: Option<Duration>,
) -> AppResult<Vec<CollectionOutcome>> {
    tracing::info!(collections = catalog.len(), "Fanning out query");

    let handles: Vec<_> = catalog
        .iter()
        .map(|collection| {
            let source = Arc::clone(&source);
            let id = collection.id.clone();
            let n_results = catalog.results_for(&collection.id);
            let query = query.to_string();
            AbortOnDropHandle::new(tokio::spawn(async move {
                source.query(&id, &query, n_results).await
            }))
        })
        .collect();

    // Dropping the joined future aborts every task still in flight.
    let joined = futures::future::join_all(handles);
    let results = match deadline {
        Some(limit) => tokio::time::timeout(limit, joined).await.map_err(|_| {
            AppError::Retrieval(format!("Fan-out deadline of {:?} exceeded", limit))
        })?,
        None => joined.await,
    };

    let outcomes = catalog
        .iter()
        .zip(results)
        .map(|(collection, result)| {
            let outcome = match result {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::warn!(
                        collection = collection.id.as_str(),
                        "Retrieval task aborted: {}",
                        e
                    );
                    SourceOutcome::degraded(format!("task failed: {}", e))
                }
            };
            CollectionOutcome {
                collection: collection.clone(),
                outcome,
            }
        })
        .collect::<Vec<_>>();

    let degraded = outcomes.iter().filter(|o| o.outcome.is_degraded()).count();
    tracing::info!(
        settled = outcomes.len(),
        degraded,
        "Fan-out complete"
    );

    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Match;
    use async_trait::async_trait;
    use odes_core::Collection;
    use std::sync::Mutex;

    /// Answers each collection after a per-collection delay, failing or
    /// panicking on request.
    struct ScriptedSource {
        delays_ms: Vec<(&'static str, u64)>,
        failing: Vec<&'static str>,
        panicking: Vec<&'static str>,
        requested: Mutex<Vec<(String, u32)>>,
    }

    impl ScriptedSource {
        fn new() -> Self {
            Self {
                delays_ms: Vec::new(),
                failing: Vec::new(),
                panicking: Vec::new(),
                requested: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl EvidenceSource for ScriptedSource {
        async fn fetch(
            &self,
            collection: &str,
            _query: &str,
            n_results: u32,
        ) -> AppResult<Vec<Match>> {
            self.requested
                .lock()
                .unwrap()
                .push((collection.to_string(), n_results));

            if let Some((_, ms)) = self.delays_ms.iter().find(|(id, _)| *id == collection) {
                tokio::time::sleep(Duration::from_millis(*ms)).await;
            }
            if self.panicking.iter().any(|id| *id == collection) {
                panic!("collection {} exploded", collection);
            }
            if self.failing.iter().any(|id| *id == collection) {
                return Err(AppError::Retrieval("connection reset".to_string()));
            }
            Ok(vec![Match::new(format!("{} evidence", collection), 0.1)])
        }
    }

    #[tokio::test]
    async fn test_one_failing_collection_leaves_others_intact() {
        let mut source = ScriptedSource::new();
        source.failing.push("case_law");
        let catalog = CollectionCatalog::default();

        let outcomes = fan_out(Arc::new(source), &catalog, "q", None).await.unwrap();

        assert_eq!(outcomes.len(), 5);
        for outcome in &outcomes {
            if outcome.collection.id == "case_law" {
                assert!(outcome.outcome.matches.is_empty());
                assert!(outcome.outcome.is_degraded());
            } else {
                assert_eq!(
                    outcome.outcome.matches[0].text,
                    format!("{} evidence", outcome.collection.id)
                );
            }
        }
    }

    #[tokio::test]
    async fn test_outcomes_follow_catalog_order_not_completion_order() {
        let mut source = ScriptedSource::new();
        source.delays_ms = vec![("primary_legislation", 60), ("insurance_qa", 0)];
        let catalog = CollectionCatalog::default();

        let outcomes = fan_out(Arc::new(source), &catalog, "q", None).await.unwrap();

        let ids: Vec<_> = outcomes.iter().map(|o| o.collection.id.as_str()).collect();
        let expected: Vec<_> = catalog.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, expected);
    }

    #[tokio::test]
    async fn test_panicking_task_degrades_only_its_collection() {
        let mut source = ScriptedSource::new();
        source.panicking.push("insurance_qa");
        let catalog = CollectionCatalog::default();

        let outcomes = fan_out(Arc::new(source), &catalog, "q", None).await.unwrap();

        let qa = outcomes.iter().find(|o| o.collection.id == "insurance_qa").unwrap();
        assert!(qa.outcome.is_degraded());
        assert_eq!(outcomes.iter().filter(|o| !o.outcome.matches.is_empty()).count(), 4);
    }

    #[tokio::test]
    async fn test_requests_use_catalog_result_counts() {
        let source = Arc::new(ScriptedSource::new());
        let catalog = CollectionCatalog::default();

        fan_out(source.clone(), &catalog, "q", None).await.unwrap();

        let requested = source.requested.lock().unwrap().clone();
        assert_eq!(requested.len(), 5);
        assert!(requested.contains(&("case_law".to_string(), 3)));
        assert!(requested.contains(&("insurance_qa".to_string(), 1)));
    }

    #[tokio::test]
    async fn test_deadline_fails_the_fan_out() {
        let mut source = ScriptedSource::new();
        source.delays_ms = vec![("only", 5_000)];
        let catalog = CollectionCatalog::new(vec![Collection::new("only", "Only", 2)]).unwrap();

        let result = fan_out(
            Arc::new(source),
            &catalog,
            "q",
            Some(Duration::from_millis(50)),
        )
        .await;

        assert!(matches!(result, Err(AppError::Retrieval(_))));
    }

    #[tokio::test]
    async fn test_deadline_aborts_outstanding_queries() {
        let mut source = ScriptedSource::new();
        source.delays_ms = vec![("slow", 500)];
        let source = Arc::new(source);
        let catalog = CollectionCatalog::new(vec![Collection::new("slow", "Slow", 2)]).unwrap();

        let deadline = Some(Duration::from_millis(20));
        let result = fan_out(source.clone(), &catalog, "q", deadline).await;
        assert!(result.is_err());

        // The sleeping task held the only other reference to the source.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(Arc::strong_count(&source), 1);
    }
}
