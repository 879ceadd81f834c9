//! LanceDB vector backend, one table per collection.
//!
//! Each registered collection maps to a LanceDB table holding embedded
//! chunks. Only the search path and a small upsert surface are exposed;
//! chunking and ingestion happen upstream.

use anyhow::{Context, Result};
use arrow_array::types::Float32Type;
use arrow_array::{
    Array, FixedSizeListArray, Float32Array, RecordBatch, RecordBatchIterator, StringArray,
};
use arrow_schema::{DataType, Field, Schema};
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{connect, Connection, Table};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use super::{VectorBackend, VectorHit};
use crate::error::BackendError;
use crate::model::MetadataFilter;

/// An embedded chunk ready for storage in a collection table.
#[derive(Debug, Clone)]
pub struct DocumentRecord {
    pub id: String,
    pub content: String,
    pub source: String,
    pub category: String,
    pub vector: Vec<f32>,
}

/// Vector search backend over a LanceDB database.
pub struct LanceVectorBackend {
    db: Connection,
    db_path: PathBuf,
    dimension: i32,
}

impl LanceVectorBackend {
    /// Open or create a LanceDB database at the given path.
    ///
    /// `dimension` must match the embedder that produced the stored vectors.
    pub async fn new(path: &Path, dimension: usize) -> Result<Self> {
        let db_path = path.to_path_buf();
        let path_str = path.to_string_lossy();

        info!("Opening LanceDB at: {}", path_str);

        let db = connect(&path_str)
            .execute()
            .await
            .with_context(|| format!("Failed to connect to LanceDB at {}", path_str))?;

        Ok(Self {
            db,
            db_path,
            dimension: dimension as i32,
        })
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Arrow schema shared by every collection table.
    fn table_schema(&self) -> Schema {
        Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new("content", DataType::Utf8, false),
            Field::new("source", DataType::Utf8, true),
            Field::new("category", DataType::Utf8, true),
            Field::new(
                "vector",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, true)),
                    self.dimension,
                ),
                false,
            ),
        ])
    }

    async fn open_collection(&self, collection: &str) -> Result<Table, BackendError> {
        let table_names = self
            .db
            .table_names()
            .execute()
            .await
            .map_err(|e| BackendError::Unavailable(e.into()))?;

        if !table_names.contains(&collection.to_string()) {
            return Err(BackendError::UnknownCollection(collection.to_string()));
        }

        self.db
            .open_table(collection)
            .execute()
            .await
            .map_err(|e| BackendError::Unavailable(e.into()))
    }

    async fn get_or_create_collection(&self, collection: &str) -> Result<Table> {
        let table_names = self.db.table_names().execute().await?;

        if table_names.contains(&collection.to_string()) {
            debug!("Opening existing table: {}", collection);
            self.db
                .open_table(collection)
                .execute()
                .await
                .with_context(|| format!("Failed to open table {}", collection))
        } else {
            debug!("Creating new table: {}", collection);
            let batches = RecordBatchIterator::new(vec![], Arc::new(self.table_schema()));
            self.db
                .create_table(collection, Box::new(batches))
                .execute()
                .await
                .with_context(|| format!("Failed to create table {}", collection))
        }
    }

    /// Insert documents into a collection, creating its table if needed.
    pub async fn add_documents(
        &self,
        collection: &str,
        documents: Vec<DocumentRecord>,
    ) -> Result<()> {
        if documents.is_empty() {
            return Ok(());
        }

        let table = self.get_or_create_collection(collection).await?;

        let batch = self.documents_to_record_batch(&documents)?;
        let batches = RecordBatchIterator::new(vec![Ok(batch)], Arc::new(self.table_schema()));

        table
            .add(Box::new(batches))
            .execute()
            .await
            .with_context(|| format!("Failed to insert documents into {}", collection))?;

        info!(
            "Inserted {} documents into collection {}",
            documents.len(),
            collection
        );

        Ok(())
    }

    /// Number of documents stored in a collection, zero if absent.
    pub async fn count_documents(&self, collection: &str) -> Result<usize> {
        let table_names = self.db.table_names().execute().await?;
        if !table_names.contains(&collection.to_string()) {
            return Ok(0);
        }

        let table = self.db.open_table(collection).execute().await?;
        table
            .count_rows(None)
            .await
            .with_context(|| format!("Failed to count documents in {}", collection))
    }

    fn documents_to_record_batch(&self, documents: &[DocumentRecord]) -> Result<RecordBatch> {
        let ids: Vec<&str> = documents.iter().map(|d| d.id.as_str()).collect();
        let contents: Vec<&str> = documents.iter().map(|d| d.content.as_str()).collect();
        let sources: Vec<&str> = documents.iter().map(|d| d.source.as_str()).collect();
        let categories: Vec<&str> = documents.iter().map(|d| d.category.as_str()).collect();

        let vector_array = FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(
            documents
                .iter()
                .map(|d| Some(d.vector.iter().map(|&v| Some(v)))),
            self.dimension,
        );

        RecordBatch::try_new(
            Arc::new(self.table_schema()),
            vec![
                Arc::new(StringArray::from(ids)),
                Arc::new(StringArray::from(contents)),
                Arc::new(StringArray::from(sources)),
                Arc::new(StringArray::from(categories)),
                Arc::new(vector_array),
            ],
        )
        .with_context(|| "Failed to create RecordBatch")
    }

    /// Compile an equality filter into a LanceDB SQL predicate.
    ///
    /// Keys become column names, so they must be plain identifiers; values
    /// are quote-escaped string literals.
    fn filter_to_predicate(filter: &MetadataFilter) -> Result<String> {
        let mut clauses = Vec::with_capacity(filter.equals.len());
        for (key, value) in &filter.equals {
            if !Self::is_identifier(key) {
                anyhow::bail!("metadata filter key is not a valid identifier: {key:?}");
            }
            clauses.push(format!("{} = '{}'", key, value.replace('\'', "''")));
        }
        Ok(clauses.join(" AND "))
    }

    fn is_identifier(key: &str) -> bool {
        let mut chars = key.chars();
        match chars.next() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
            _ => return false,
        }
        chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    }

    fn batch_to_hits(batch: &RecordBatch) -> Result<Vec<VectorHit>> {
        let ids = batch
            .column_by_name("id")
            .and_then(|c| c.as_any().downcast_ref::<StringArray>())
            .ok_or_else(|| anyhow::anyhow!("Missing id column"))?;

        let contents = batch
            .column_by_name("content")
            .and_then(|c| c.as_any().downcast_ref::<StringArray>())
            .ok_or_else(|| anyhow::anyhow!("Missing content column"))?;

        let sources = batch
            .column_by_name("source")
            .and_then(|c| c.as_any().downcast_ref::<StringArray>());

        let categories = batch
            .column_by_name("category")
            .and_then(|c| c.as_any().downcast_ref::<StringArray>());

        // LanceDB attaches the similarity distance as a _distance column
        let distances = batch
            .column_by_name("_distance")
            .and_then(|c| c.as_any().downcast_ref::<Float32Array>())
            .ok_or_else(|| anyhow::anyhow!("Missing _distance column"))?;

        let mut hits = Vec::with_capacity(batch.num_rows());

        for i in 0..batch.num_rows() {
            let mut metadata = BTreeMap::new();
            if let Some(sources) = sources {
                if !sources.is_null(i) {
                    metadata.insert("source".to_string(), sources.value(i).to_string());
                }
            }
            if let Some(categories) = categories {
                if !categories.is_null(i) {
                    metadata.insert("category".to_string(), categories.value(i).to_string());
                }
            }

            hits.push(VectorHit {
                id: ids.value(i).to_string(),
                content: contents.value(i).to_string(),
                metadata,
                distance: distances.value(i),
            });
        }

        Ok(hits)
    }
}

#[async_trait]
impl VectorBackend for LanceVectorBackend {
    async fn query(
        &self,
        collection: &str,
        vector: &[f32],
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<VectorHit>, BackendError> {
        let table = self.open_collection(collection).await?;

        let mut query = table
            .vector_search(vector.to_vec())
            .map_err(|e| BackendError::Unavailable(e.into()))?
            .limit(k);

        if let Some(filter) = filter.filter(|f| !f.is_empty()) {
            let predicate =
                Self::filter_to_predicate(filter).map_err(BackendError::Unavailable)?;
            query = query.only_if(predicate);
        }

        let results = query
            .execute()
            .await
            .map_err(|e| BackendError::Unavailable(e.into()))?;

        let batches: Vec<RecordBatch> = results
            .try_collect()
            .await
            .map_err(|e| BackendError::Unavailable(e.into()))?;

        let mut hits = Vec::new();
        for batch in &batches {
            hits.extend(Self::batch_to_hits(batch).map_err(BackendError::Unavailable)?);
        }

        debug!(
            collection = collection,
            hits = hits.len(),
            "Vector search returned"
        );

        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_to_predicate_single_clause() {
        let filter = MetadataFilter::field_equals("category", "industry_news");
        assert_eq!(
            LanceVectorBackend::filter_to_predicate(&filter).unwrap(),
            "category = 'industry_news'"
        );
    }

    #[test]
    fn test_filter_to_predicate_escapes_quotes() {
        let filter = MetadataFilter::field_equals("source", "o'reilly");
        assert_eq!(
            LanceVectorBackend::filter_to_predicate(&filter).unwrap(),
            "source = 'o''reilly'"
        );
    }

    #[test]
    fn test_filter_to_predicate_joins_clauses() {
        let mut filter = MetadataFilter::field_equals("category", "technical_docs");
        filter
            .equals
            .insert("source".to_string(), "manual".to_string());
        assert_eq!(
            LanceVectorBackend::filter_to_predicate(&filter).unwrap(),
            "category = 'technical_docs' AND source = 'manual'"
        );
    }

    #[test]
    fn test_filter_to_predicate_rejects_non_identifier_keys() {
        for key in ["category' OR '1'='1", "a-b", "1col", "", "col name"] {
            let filter = MetadataFilter::field_equals(key, "x");
            assert!(
                LanceVectorBackend::filter_to_predicate(&filter).is_err(),
                "key {key:?} should be rejected"
            );
        }
    }
}
