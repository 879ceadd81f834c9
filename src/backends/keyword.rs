//! BM25 keyword backend using Tantivy.
//!
//! Fills the role of the keyword index in the hybrid fan-out: one full-text
//! index across every category of ingested content. BM25 scores live in a
//! different numeric space than vector distance and are never compared
//! against it downstream.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::RwLock;
use tantivy::collector::TopDocs;
use tantivy::query::QueryParser;
use tantivy::schema::{Field, Schema, Value as _, STORED, STRING, TEXT};
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument};
use tracing::{debug, info, warn};

use super::{KeywordBackend, KeywordHit};
use crate::error::BackendError;

/// Index directory name within the data directory.
const KEYWORD_INDEX_DIR: &str = "keyword.index";

/// Schema field names
const FIELD_ID: &str = "id";
const FIELD_CONTENT: &str = "content";
const FIELD_SOURCE: &str = "source";
const FIELD_CATEGORY: &str = "category";

/// A document to add to the keyword index.
#[derive(Debug, Clone)]
pub struct KeywordDocument {
    pub id: String,
    pub content: String,
    pub source: String,
    pub category: String,
}

/// Keyword index schema.
#[derive(Clone)]
struct KeywordSchema {
    schema: Schema,
    id: Field,
    content: Field,
    source: Field,
    category: Field,
}

impl KeywordSchema {
    fn new() -> Self {
        let mut schema_builder = Schema::builder();

        let id = schema_builder.add_text_field(FIELD_ID, STRING | STORED);
        let content = schema_builder.add_text_field(FIELD_CONTENT, TEXT | STORED);
        let source = schema_builder.add_text_field(FIELD_SOURCE, STORED);
        let category = schema_builder.add_text_field(FIELD_CATEGORY, STRING | STORED);

        let schema = schema_builder.build();

        Self {
            schema,
            id,
            content,
            source,
            category,
        }
    }
}

/// BM25 keyword index over ingested chunks.
struct KeywordIndex {
    index: Index,
    schema: KeywordSchema,
    writer: IndexWriter,
    reader: IndexReader,
}

impl KeywordIndex {
    /// Create or open the keyword index under the given data directory.
    fn new(path: &Path) -> Result<Self> {
        let index_path = path.join(KEYWORD_INDEX_DIR);
        let schema = KeywordSchema::new();

        let index = if index_path.exists() {
            info!("Opening existing keyword index at {:?}", index_path);
            Index::open_in_dir(&index_path)
                .with_context(|| format!("Failed to open keyword index at {:?}", index_path))?
        } else {
            info!("Creating new keyword index at {:?}", index_path);
            std::fs::create_dir_all(&index_path).with_context(|| {
                format!("Failed to create keyword index directory {:?}", index_path)
            })?;
            Index::create_in_dir(&index_path, schema.schema.clone())
                .with_context(|| format!("Failed to create keyword index at {:?}", index_path))?
        };

        // 50MB writer heap
        let writer = index
            .writer(50_000_000)
            .with_context(|| "Failed to create index writer")?;

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::OnCommitWithDelay)
            .try_into()
            .with_context(|| "Failed to create index reader")?;

        Ok(Self {
            index,
            schema,
            writer,
            reader,
        })
    }

    fn add_documents(&mut self, documents: &[KeywordDocument]) -> Result<()> {
        for document in documents {
            self.writer.add_document(doc!(
                self.schema.id => document.id.as_str(),
                self.schema.content => document.content.as_str(),
                self.schema.source => document.source.as_str(),
                self.schema.category => document.category.as_str(),
            ))?;
        }

        debug!("Added {} documents to keyword index", documents.len());
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.writer
            .commit()
            .with_context(|| "Failed to commit keyword index changes")?;

        self.reader
            .reload()
            .with_context(|| "Failed to reload index reader")?;

        info!("Keyword index committed");
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.writer.delete_all_documents()?;
        self.commit()?;
        info!("Keyword index cleared");
        Ok(())
    }

    fn doc_count(&self) -> u64 {
        self.reader.searcher().num_docs()
    }

    fn search(&self, query: &str, limit: usize) -> Result<Vec<KeywordHit>> {
        let searcher = self.reader.searcher();

        let query_parser = QueryParser::for_index(&self.index, vec![self.schema.content]);
        let parsed_query = match query_parser.parse_query(query) {
            Ok(q) => q,
            Err(e) => {
                warn!("Failed to parse query '{}': {}", query, e);
                // Strip query-language punctuation and retry
                let escaped = query.replace(
                    [
                        '(', ')', '[', ']', '{', '}', '"', '\'', ':', '\\', '/', '^', '~', '*',
                        '?', '!', '+', '-',
                    ],
                    " ",
                );
                query_parser
                    .parse_query(&escaped)
                    .with_context(|| format!("Failed to parse escaped query: {}", escaped))?
            }
        };

        let top_docs = searcher
            .search(&parsed_query, &TopDocs::with_limit(limit))
            .with_context(|| "Failed to execute keyword search")?;

        let mut hits = Vec::with_capacity(top_docs.len());

        for (score, doc_address) in top_docs {
            let retrieved_doc: TantivyDocument = searcher
                .doc(doc_address)
                .with_context(|| "Failed to retrieve document")?;

            let id = retrieved_doc
                .get_first(self.schema.id)
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();

            let content = retrieved_doc
                .get_first(self.schema.content)
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();

            let mut metadata = BTreeMap::new();
            if let Some(source) = retrieved_doc
                .get_first(self.schema.source)
                .and_then(|v| v.as_str())
            {
                metadata.insert("source".to_string(), source.to_string());
            }
            if let Some(category) = retrieved_doc
                .get_first(self.schema.category)
                .and_then(|v| v.as_str())
            {
                metadata.insert("category".to_string(), category.to_string());
            }

            hits.push(KeywordHit {
                id,
                content,
                metadata,
                score,
            });
        }

        debug!("Keyword search returned {} hits", hits.len());
        Ok(hits)
    }
}

/// Thread-safe keyword backend for use in async contexts.
pub struct TantivyKeywordBackend {
    index: RwLock<KeywordIndex>,
}

impl TantivyKeywordBackend {
    /// Create or open the keyword backend under the given data directory.
    pub fn new(path: &Path) -> Result<Self> {
        let index = KeywordIndex::new(path)?;
        Ok(Self {
            index: RwLock::new(index),
        })
    }

    /// Whether a keyword index exists under the given data directory.
    pub fn exists(path: &Path) -> bool {
        path.join(KEYWORD_INDEX_DIR).exists()
    }

    /// Add documents and commit them so they are immediately searchable.
    pub fn add_documents(&self, documents: &[KeywordDocument]) -> Result<()> {
        let mut index = self.write_lock();
        index.add_documents(documents)?;
        index.commit()
    }

    /// Remove every document from the index.
    pub fn clear(&self) -> Result<()> {
        self.write_lock().clear()
    }

    /// Number of searchable documents.
    pub fn doc_count(&self) -> u64 {
        self.read_lock().doc_count()
    }

    fn write_lock(&self) -> std::sync::RwLockWriteGuard<'_, KeywordIndex> {
        self.index.write().unwrap_or_else(|poisoned| {
            // Accept potential inconsistency over complete failure in this
            // read-heavy workload
            poisoned.into_inner()
        })
    }

    fn read_lock(&self) -> std::sync::RwLockReadGuard<'_, KeywordIndex> {
        self.index.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl KeywordBackend for TantivyKeywordBackend {
    async fn query(&self, text: &str, k: usize) -> Result<Vec<KeywordHit>, BackendError> {
        let hits = self
            .read_lock()
            .search(text, k)
            .map_err(BackendError::Unavailable)?;
        Ok(hits)
    }
}
