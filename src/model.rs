//! Canonical types flowing through the retrieval engine.
//!
//! Every backend response is normalized into a [`SearchResult`] before
//! ranking; backends never see each other's native shapes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::RetrievalError;

/// Metadata value substituted when a backend omits a field.
///
/// Downstream prompt builders read `source` and `category` unconditionally,
/// so missing fields are filled in rather than left absent.
pub const UNKNOWN_FIELD: &str = "Unknown";

/// Which backend produced a given result occurrence.
///
/// Only used for merge precedence and tie-breaking. The declaration order
/// matters: `Vector` sorts before `Keyword`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum OriginKind {
    Vector,
    Keyword,
}

impl std::fmt::Display for OriginKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OriginKind::Vector => write!(f, "vector"),
            OriginKind::Keyword => write!(f, "keyword"),
        }
    }
}

/// The canonical unit flowing through the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// Stable chunk identifier, shared across backends for the same chunk.
    /// This is the deduplication key.
    pub id: String,
    /// The chunk's text payload.
    pub content: String,
    /// String-valued metadata; `source` and `category` are always present
    /// after normalization.
    pub metadata: BTreeMap<String, String>,
    /// Similarity distance, smaller is more similar. `Some` for vector hits,
    /// always `None` for keyword hits.
    pub distance: Option<f32>,
    /// Backend that produced this occurrence.
    pub origin: OriginKind,
}

impl SearchResult {
    /// Distance used for ranking; keyword-only hits sort after every vector
    /// hit with a real distance.
    pub fn ranking_distance(&self) -> f32 {
        self.distance.unwrap_or(f32::INFINITY)
    }
}

/// Equality filter over result metadata, applied by the vector backends.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataFilter {
    pub equals: BTreeMap<String, String>,
}

impl MetadataFilter {
    /// Single-key equality filter.
    pub fn field_equals(key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut equals = BTreeMap::new();
        equals.insert(key.into(), value.into());
        Self { equals }
    }

    pub fn is_empty(&self) -> bool {
        self.equals.is_empty()
    }

    /// Whether a result's metadata satisfies every equality clause.
    pub fn matches(&self, metadata: &BTreeMap<String, String>) -> bool {
        self.equals
            .iter()
            .all(|(k, v)| metadata.get(k).is_some_and(|m| m == v))
    }
}

/// Ordered, duplicate-free list of collection identifiers to query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSet(Vec<String>);

impl CollectionSet {
    /// Build a collection set, rejecting empty input and duplicates.
    pub fn new(ids: Vec<String>) -> Result<Self, RetrievalError> {
        if ids.is_empty() {
            return Err(RetrievalError::invalid_query(
                "collection set must not be empty",
            ));
        }
        let mut seen = std::collections::HashSet::new();
        for id in &ids {
            if !seen.insert(id.as_str()) {
                return Err(RetrievalError::invalid_query(format!(
                    "duplicate collection in set: {id}"
                )));
            }
        }
        Ok(Self(ids))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Immutable per-call parameters, built once by the orchestrator.
///
/// The query vector is computed once and reused across every vector backend.
#[derive(Debug, Clone)]
pub struct QueryContext {
    pub query: String,
    pub vector: Vec<f32>,
    pub k: usize,
    pub filter: Option<MetadataFilter>,
}
