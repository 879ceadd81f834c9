use anyhow::{Context, Result};
use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use super::Embedder;
use crate::metrics::{EMBEDDING_LATENCY, EMBEDDING_REQUESTS};

/// Local embedding provider backed by fastembed.
pub struct FastEmbedEmbedder {
    model: Arc<TextEmbedding>,
    dimension: usize,
}

impl FastEmbedEmbedder {
    /// Load the configured embedding model.
    pub fn new(model_name: &str) -> Result<Self> {
        let model_type = Self::parse_model_name(model_name);
        let dimension = Self::model_dimension(model_name);

        info!("Loading embedding model: {}", model_name);

        let model = TextEmbedding::try_new(
            InitOptions::new(model_type).with_show_download_progress(true),
        )
        .with_context(|| format!("Failed to initialize embedding model: {}", model_name))?;

        info!("Embedding model loaded successfully");

        Ok(Self {
            model: Arc::new(model),
            dimension,
        })
    }

    fn parse_model_name(name: &str) -> EmbeddingModel {
        match name {
            "all-MiniLM-L6-v2" | "all-minilm-l6-v2" => EmbeddingModel::AllMiniLML6V2,
            "nomic-embed-text-v1.5" | "nomic-embed-text" => EmbeddingModel::NomicEmbedTextV15,
            "bge-small-en-v1.5" | "bge-small" => EmbeddingModel::BGESmallENV15,
            "bge-base-en-v1.5" | "bge-base" => EmbeddingModel::BGEBaseENV15,
            _ => {
                warn!(
                    "Unknown model '{}', falling back to all-MiniLM-L6-v2",
                    name
                );
                EmbeddingModel::AllMiniLML6V2
            }
        }
    }

    fn model_dimension(name: &str) -> usize {
        match name {
            name if name.contains("MiniLM") || name.contains("minilm") => 384,
            name if name.contains("nomic") => 768,
            name if name.contains("bge-small") => 384,
            name if name.contains("bge-base") => 768,
            _ => 384,
        }
    }
}

#[async_trait]
impl Embedder for FastEmbedEmbedder {
    async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        EMBEDDING_REQUESTS.inc();
        let start = Instant::now();

        // fastembed is synchronous, keep it off the async runtime threads
        let model = self.model.clone();
        let query = query.to_string();

        let mut embeddings = tokio::task::spawn_blocking(move || {
            model
                .embed(vec![query.as_str()], None)
                .with_context(|| "Failed to generate query embedding")
        })
        .await
        .context("Embedding task failed")??;

        EMBEDDING_LATENCY.observe(start.elapsed().as_secs_f64());

        embeddings
            .pop()
            .ok_or_else(|| anyhow::anyhow!("No embedding generated for query"))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &'static str {
        "fastembed"
    }
}
