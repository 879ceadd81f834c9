//! Error taxonomy for the retrieval engine.
//!
//! A single backend failing is recovered locally by the fan-out coordinator
//! and never reaches the caller as an error. Only `InvalidQuery`,
//! `Embedding`, and `TotalRetrievalFailure` propagate.

use std::time::Duration;
use thiserror::Error;

use crate::model::OriginKind;

/// A failure of one backend, recovered by substituting an empty result set.
#[derive(Debug, Clone)]
pub struct BackendFailure {
    pub origin: OriginKind,
    /// Collection the failing vector query targeted; `None` for the keyword
    /// backend.
    pub collection: Option<String>,
    pub reason: String,
}

impl std::fmt::Display for BackendFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.collection {
            Some(collection) => write!(f, "{} [{}]: {}", self.origin, collection, self.reason),
            None => write!(f, "{}: {}", self.origin, self.reason),
        }
    }
}

/// Error raised by an individual backend call.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend call timed out after {0:?}")]
    Timeout(Duration),

    #[error("unknown collection: {0}")]
    UnknownCollection(String),

    #[error(transparent)]
    Unavailable(#[from] anyhow::Error),
}

/// Error surfaced to callers of the hybrid retriever.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// Caller error, rejected before any backend call is made.
    #[error("invalid query: {reason}")]
    InvalidQuery { reason: String },

    /// The query embedder failed; no vector backend can be queried.
    #[error("failed to embed query: {0}")]
    Embedding(anyhow::Error),

    /// Every backend failed. Distinguishes "retrieval broke" from "nothing
    /// relevant found" (which is an empty Ok result).
    #[error("all {} retrieval backends failed", .failures.len())]
    TotalRetrievalFailure { failures: Vec<BackendFailure> },
}

impl RetrievalError {
    pub fn invalid_query(reason: impl Into<String>) -> Self {
        Self::InvalidQuery {
            reason: reason.into(),
        }
    }
}
