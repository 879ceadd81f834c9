//! CLI command implementations.

pub mod collections;
pub mod search;
pub mod search_collections;
pub mod status;

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::backends::{CollectionRegistry, LanceVectorBackend, TantivyKeywordBackend};
use crate::embeddings::{Embedder, FastEmbedEmbedder};
use crate::retrieval::HybridRetriever;
use crate::Config;

/// Wire the retriever from configuration: embedder, LanceDB vector backend,
/// Tantivy keyword backend, and the collection registry.
pub(crate) async fn build_retriever(config: &Config, root: &Path) -> Result<HybridRetriever> {
    let embedder = Arc::new(FastEmbedEmbedder::new(&config.embeddings.model)?);

    let vector = Arc::new(
        LanceVectorBackend::new(&config.vector_db_path(root), embedder.dimension()).await?,
    );
    let keyword = Arc::new(TantivyKeywordBackend::new(&Config::data_dir(root))?);
    let registry = CollectionRegistry::new(config.collections.registered.clone());

    Ok(HybridRetriever::new(embedder, vector, keyword, registry)
        .with_backend_timeout(Duration::from_millis(config.search.backend_timeout_ms)))
}
