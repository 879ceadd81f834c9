//! Backend seams consumed by the retrieval engine.
//!
//! The engine only sees these traits; the LanceDB and Tantivy adapters in
//! this module are the shipped implementations, and tests substitute stubs.

mod keyword;
mod vector;

pub use keyword::{KeywordDocument, TantivyKeywordBackend};
pub use vector::{DocumentRecord, LanceVectorBackend};

use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::error::{BackendError, RetrievalError};
use crate::model::{CollectionSet, MetadataFilter};

/// Raw row returned by a vector backend before normalization.
#[derive(Debug, Clone)]
pub struct VectorHit {
    pub id: String,
    pub content: String,
    pub metadata: BTreeMap<String, String>,
    /// Similarity distance, ascending order from the backend.
    pub distance: f32,
}

/// Raw row returned by the keyword backend before normalization.
///
/// The relevance score lives in a different numeric space than vector
/// distance and is not reused past normalization.
#[derive(Debug, Clone)]
pub struct KeywordHit {
    pub id: String,
    pub content: String,
    pub metadata: BTreeMap<String, String>,
    pub score: f32,
}

/// Similarity search over one named collection of embedded chunks.
#[async_trait]
pub trait VectorBackend: Send + Sync {
    /// Query a collection with a precomputed query vector.
    ///
    /// Results come back ordered ascending by distance. Fails with a
    /// [`BackendError`] on unknown collection or transport failure.
    async fn query(
        &self,
        collection: &str,
        vector: &[f32],
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<VectorHit>, BackendError>;
}

/// Full-text relevance search over the single keyword index.
#[async_trait]
pub trait KeywordBackend: Send + Sync {
    async fn query(&self, text: &str, k: usize) -> Result<Vec<KeywordHit>, BackendError>;
}

/// The set of collection identifiers valid for a call.
///
/// Static for the lifetime of one retriever; a requested id outside the
/// registry is treated as that one backend failing, not as a caller error.
#[derive(Debug, Clone)]
pub struct CollectionRegistry {
    collections: Vec<String>,
}

/// Collections registered by the broadcast-media assistant's ingestion jobs.
pub const DEFAULT_COLLECTIONS: [&str; 4] = [
    "broadcast_transcripts",
    "production_metadata",
    "technical_docs",
    "industry_news",
];

impl CollectionRegistry {
    /// Build a registry, silently dropping duplicate identifiers.
    pub fn new(collections: Vec<String>) -> Self {
        let mut seen = std::collections::HashSet::new();
        let collections = collections
            .into_iter()
            .filter(|c| seen.insert(c.clone()))
            .collect();
        Self { collections }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.collections.iter().any(|c| c == id)
    }

    /// The full registered set, in registration order.
    ///
    /// Fails with [`RetrievalError::InvalidQuery`] when nothing is
    /// registered.
    pub fn all(&self) -> Result<CollectionSet, RetrievalError> {
        if self.collections.is_empty() {
            return Err(RetrievalError::invalid_query("no collections registered"));
        }
        CollectionSet::new(self.collections.clone())
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.collections.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }
}

impl Default for CollectionRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_COLLECTIONS.iter().map(|s| s.to_string()).collect())
    }
}
