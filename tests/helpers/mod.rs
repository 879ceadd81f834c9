//! Scripted stub backends for exercising the retrieval engine without
//! real vector or keyword stores.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use mediarag::backends::{KeywordBackend, KeywordHit, VectorBackend, VectorHit};
use mediarag::error::BackendError;
use mediarag::model::MetadataFilter;

/// Build a vector hit with the given id and distance.
pub fn vector_hit(id: &str, distance: f32) -> VectorHit {
    let mut metadata = BTreeMap::new();
    metadata.insert("source".to_string(), format!("source of {id}"));
    metadata.insert("category".to_string(), "broadcast_transcripts".to_string());
    VectorHit {
        id: id.to_string(),
        content: format!("content of {id}"),
        metadata,
        distance,
    }
}

/// Build a keyword hit with the given id.
pub fn keyword_hit(id: &str) -> KeywordHit {
    let mut metadata = BTreeMap::new();
    metadata.insert("source".to_string(), format!("source of {id}"));
    metadata.insert("category".to_string(), "industry_news".to_string());
    KeywordHit {
        id: id.to_string(),
        content: format!("content of {id}"),
        metadata,
        score: 4.2,
    }
}

#[derive(Default, Clone)]
struct Behavior {
    hits: Vec<VectorHit>,
    fail: bool,
    delay: Option<Duration>,
}

/// Vector backend with canned per-collection responses.
#[derive(Default)]
pub struct StubVectorBackend {
    collections: HashMap<String, Behavior>,
}

impl StubVectorBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hits(mut self, collection: &str, hits: Vec<VectorHit>) -> Self {
        self.collections
            .entry(collection.to_string())
            .or_default()
            .hits = hits;
        self
    }

    pub fn with_failure(mut self, collection: &str) -> Self {
        self.collections
            .entry(collection.to_string())
            .or_default()
            .fail = true;
        self
    }

    pub fn with_delay(mut self, collection: &str, delay: Duration) -> Self {
        self.collections
            .entry(collection.to_string())
            .or_default()
            .delay = Some(delay);
        self
    }
}

#[async_trait]
impl VectorBackend for StubVectorBackend {
    async fn query(
        &self,
        collection: &str,
        _vector: &[f32],
        k: usize,
        _filter: Option<&MetadataFilter>,
    ) -> Result<Vec<VectorHit>, BackendError> {
        let behavior = self.collections.get(collection).cloned().unwrap_or_default();

        if let Some(delay) = behavior.delay {
            tokio::time::sleep(delay).await;
        }

        if behavior.fail {
            return Err(BackendError::Unavailable(anyhow::anyhow!(
                "stub vector backend down for {collection}"
            )));
        }

        Ok(behavior.hits.into_iter().take(k).collect())
    }
}

/// Keyword backend with one canned response.
#[derive(Default)]
pub struct StubKeywordBackend {
    hits: Vec<KeywordHit>,
    fail: bool,
    delay: Option<Duration>,
}

impl StubKeywordBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hits(mut self, hits: Vec<KeywordHit>) -> Self {
        self.hits = hits;
        self
    }

    pub fn with_failure(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl KeywordBackend for StubKeywordBackend {
    async fn query(&self, _text: &str, k: usize) -> Result<Vec<KeywordHit>, BackendError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail {
            return Err(BackendError::Unavailable(anyhow::anyhow!(
                "stub keyword backend down"
            )));
        }

        Ok(self.hits.iter().take(k).cloned().collect())
    }
}
