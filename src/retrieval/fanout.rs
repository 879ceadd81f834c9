//! Concurrent fan-out across every registered backend.
//!
//! One vector query per collection plus the keyword query run concurrently,
//! each under its own timeout, so per-query latency is bounded by the
//! slowest single backend rather than the sum. Each call writes only its
//! own response slot; the only synchronization point is the join.

use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::backends::{
    CollectionRegistry, KeywordBackend, KeywordHit, VectorBackend, VectorHit,
};
use crate::error::BackendError;
use crate::model::{CollectionSet, OriginKind, QueryContext};

/// Default per-backend timeout.
pub const DEFAULT_BACKEND_TIMEOUT: Duration = Duration::from_secs(2);

/// Raw hits from one backend, still in its native shape.
#[derive(Debug, Clone)]
pub enum RawHits {
    Vector(Vec<VectorHit>),
    Keyword(Vec<KeywordHit>),
}

/// One backend's contribution to a query: its origin, the collection it
/// targeted (vector only), and either its hits or its failure.
#[derive(Debug)]
pub struct BackendResponse {
    pub origin: OriginKind,
    pub collection: Option<String>,
    pub outcome: Result<RawHits, BackendError>,
}

impl BackendResponse {
    pub fn failed(&self) -> bool {
        self.outcome.is_err()
    }
}

/// Issues the per-collection vector queries and the keyword query and
/// collects the raw responses. Does not rank, only collects.
pub struct FanOutCoordinator {
    vector: Arc<dyn VectorBackend>,
    keyword: Arc<dyn KeywordBackend>,
    registry: CollectionRegistry,
    backend_timeout: Duration,
}

impl FanOutCoordinator {
    pub fn new(
        vector: Arc<dyn VectorBackend>,
        keyword: Arc<dyn KeywordBackend>,
        registry: CollectionRegistry,
    ) -> Self {
        Self {
            vector,
            keyword,
            registry,
            backend_timeout: DEFAULT_BACKEND_TIMEOUT,
        }
    }

    pub fn with_backend_timeout(mut self, backend_timeout: Duration) -> Self {
        self.backend_timeout = backend_timeout;
        self
    }

    pub fn registry(&self) -> &CollectionRegistry {
        &self.registry
    }

    /// Dispatch the full fan-out: N collections + 1 keyword backend.
    ///
    /// Always returns N+1 responses; a failed backend contributes an `Err`
    /// slot rather than aborting the query.
    pub async fn dispatch(
        &self,
        ctx: &QueryContext,
        collections: &CollectionSet,
    ) -> Vec<BackendResponse> {
        let vector_calls = join_all(
            collections
                .iter()
                .map(|collection| self.query_collection(ctx, collection)),
        );

        let (mut responses, keyword_response) =
            tokio::join!(vector_calls, self.query_keyword(ctx));
        responses.push(keyword_response);

        let failed = responses.iter().filter(|r| r.failed()).count();
        debug!(
            backends = responses.len(),
            failed = failed,
            "Fan-out complete"
        );

        responses
    }

    /// Dispatch only the per-collection vector queries, for the grouped
    /// (unmerged) search variant.
    pub async fn dispatch_vector_only(
        &self,
        ctx: &QueryContext,
        collections: &CollectionSet,
    ) -> Vec<BackendResponse> {
        join_all(
            collections
                .iter()
                .map(|collection| self.query_collection(ctx, collection)),
        )
        .await
    }

    async fn query_collection(&self, ctx: &QueryContext, collection: &str) -> BackendResponse {
        let outcome = if !self.registry.contains(collection) {
            // Requested collection outside the registry degrades that one
            // slot instead of failing the whole query
            Err(BackendError::UnknownCollection(collection.to_string()))
        } else {
            match timeout(
                self.backend_timeout,
                self.vector
                    .query(collection, &ctx.vector, ctx.k, ctx.filter.as_ref()),
            )
            .await
            {
                Ok(result) => result.map(RawHits::Vector),
                Err(_) => Err(BackendError::Timeout(self.backend_timeout)),
            }
        };

        if let Err(e) = &outcome {
            warn!(
                collection = collection,
                error = %e,
                "Vector backend failed, contributing empty results"
            );
        }

        BackendResponse {
            origin: OriginKind::Vector,
            collection: Some(collection.to_string()),
            outcome,
        }
    }

    async fn query_keyword(&self, ctx: &QueryContext) -> BackendResponse {
        let outcome = match timeout(
            self.backend_timeout,
            self.keyword.query(&ctx.query, ctx.k),
        )
        .await
        {
            Ok(result) => result.map(RawHits::Keyword),
            Err(_) => Err(BackendError::Timeout(self.backend_timeout)),
        };

        if let Err(e) = &outcome {
            warn!(error = %e, "Keyword backend failed, contributing empty results");
        }

        BackendResponse {
            origin: OriginKind::Keyword,
            collection: None,
            outcome,
        }
    }
}
