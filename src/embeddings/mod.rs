//! Query embedding providers.
//!
//! The retriever computes one query vector per call and reuses it across
//! every vector collection. Embedding is deterministic for identical input
//! within a process lifetime.

mod fastembed_provider;
mod mock;

pub use fastembed_provider::FastEmbedEmbedder;
pub use mock::MockEmbedder;

use anyhow::Result;
use async_trait::async_trait;

/// Turns query text into a fixed-dimension vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed_query(&self, query: &str) -> Result<Vec<f32>>;

    /// Dimension of vectors produced by this embedder.
    fn dimension(&self) -> usize;

    /// Provider name for logging.
    fn name(&self) -> &'static str;
}
