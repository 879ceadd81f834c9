//! The hybrid search orchestrator, the engine's single entry point.
//!
//! Per call: validate, embed once, fan out, normalize, merge, truncate.
//! Everything is created fresh per query and discarded afterwards; the
//! retriever holds no state beyond its injected collaborators.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::fanout::FanOutCoordinator;
use super::merge::merge_ranked;
use super::normalize::normalize_response;
use crate::backends::{CollectionRegistry, KeywordBackend, VectorBackend};
use crate::embeddings::Embedder;
use crate::error::{BackendFailure, RetrievalError};
use crate::metrics::{BACKEND_FAILURES, SEARCH_LATENCY, SEARCH_REQUESTS, SEARCH_RESULTS};
use crate::model::{CollectionSet, MetadataFilter, QueryContext, SearchResult};

/// Hybrid retriever over N vector collections and one keyword index.
///
/// Collaborators are dependency-injected at construction so the engine can
/// be exercised with stub backends.
pub struct HybridRetriever {
    embedder: Arc<dyn Embedder>,
    coordinator: FanOutCoordinator,
}

impl HybridRetriever {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        vector: Arc<dyn VectorBackend>,
        keyword: Arc<dyn KeywordBackend>,
        registry: CollectionRegistry,
    ) -> Self {
        Self {
            embedder,
            coordinator: FanOutCoordinator::new(vector, keyword, registry),
        }
    }

    /// Override the per-backend timeout.
    pub fn with_backend_timeout(mut self, timeout: Duration) -> Self {
        self.coordinator = self.coordinator.with_backend_timeout(timeout);
        self
    }

    pub fn registry(&self) -> &CollectionRegistry {
        self.coordinator.registry()
    }

    /// Hybrid search: merged, deduplicated, ranked, at most `k` results.
    ///
    /// A degraded result (some backends failed) is returned normally; only
    /// an invalid query, an embedding failure, or every backend failing
    /// surfaces as an error.
    pub async fn search(
        &self,
        query: &str,
        k: usize,
        collections: Option<CollectionSet>,
        filter: Option<MetadataFilter>,
    ) -> Result<Vec<SearchResult>, RetrievalError> {
        SEARCH_REQUESTS.inc();
        let start = Instant::now();

        let collections = match collections {
            Some(set) => set,
            None => self.default_collections()?,
        };
        let ctx = self.build_context(query, k, filter).await?;

        let responses = self.coordinator.dispatch(&ctx, &collections).await;
        let backend_count = responses.len();

        let mut combined = Vec::new();
        let mut failures: Vec<BackendFailure> = Vec::new();

        // Enumeration order feeds the first-seen-wins rule in the merge
        for response in responses {
            let normalized = normalize_response(response);
            combined.extend(normalized.results);
            if let Some(failure) = normalized.failure {
                BACKEND_FAILURES.inc();
                failures.push(failure);
            }
        }

        if failures.len() == backend_count {
            return Err(RetrievalError::TotalRetrievalFailure { failures });
        }

        let merged = merge_ranked(combined, ctx.k);

        let elapsed = start.elapsed();
        SEARCH_LATENCY.observe(elapsed.as_secs_f64());
        SEARCH_RESULTS.observe(merged.len() as f64);

        info!(
            search_type = "hybrid",
            query = query,
            results = merged.len(),
            degraded_backends = failures.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Hybrid search completed"
        );

        Ok(merged)
    }

    /// Grouped variant: per-collection top-k vector results, unmerged, for
    /// callers that want provenance rather than a single ranked list.
    pub async fn search_per_collection(
        &self,
        query: &str,
        k: usize,
        filter: Option<MetadataFilter>,
    ) -> Result<BTreeMap<String, Vec<SearchResult>>, RetrievalError> {
        let start = Instant::now();

        let collections = self.default_collections()?;
        let ctx = self.build_context(query, k, filter).await?;

        let responses = self.coordinator.dispatch_vector_only(&ctx, &collections).await;
        let backend_count = responses.len();

        let mut grouped = BTreeMap::new();
        let mut failures = Vec::new();

        for response in responses {
            let normalized = normalize_response(response);
            let collection = normalized
                .collection
                .unwrap_or_else(|| "unknown".to_string());
            if let Some(failure) = normalized.failure {
                BACKEND_FAILURES.inc();
                failures.push(failure);
            }
            grouped.insert(collection, normalized.results);
        }

        if failures.len() == backend_count {
            return Err(RetrievalError::TotalRetrievalFailure { failures });
        }

        info!(
            search_type = "per_collection",
            query = query,
            collections = grouped.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Per-collection search completed"
        );

        Ok(grouped)
    }

    fn default_collections(&self) -> Result<CollectionSet, RetrievalError> {
        self.registry().all()
    }

    /// Validate the call and embed the query once.
    async fn build_context(
        &self,
        query: &str,
        k: usize,
        filter: Option<MetadataFilter>,
    ) -> Result<QueryContext, RetrievalError> {
        if query.trim().is_empty() {
            return Err(RetrievalError::invalid_query("query text must not be empty"));
        }
        if k == 0 {
            return Err(RetrievalError::invalid_query("k must be at least 1"));
        }

        let vector = self
            .embedder
            .embed_query(query)
            .await
            .map_err(RetrievalError::Embedding)?;

        debug!(
            dimensions = vector.len(),
            embedder = self.embedder.name(),
            "Generated query embedding"
        );

        Ok(QueryContext {
            query: query.to_string(),
            vector,
            k,
            filter,
        })
    }
}
