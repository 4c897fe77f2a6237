//! Vector store abstraction for docqa.
//!
//! Entries live in named collections. A collection records the embedding
//! model and vector size it was built with; searches never cross collections.

mod memory;
mod sqlite;

pub use memory::MemoryVectorStore;
pub use sqlite::SqliteVectorStore;

use crate::chunking::Chunk;
use crate::config::{Settings, VectorStoreProvider};
use crate::error::{DocqaError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// A chunk stored with its embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Derived from (collection, source, chunk index), so re-indexing overwrites.
    pub id: Uuid,
    pub collection: String,
    /// Source document identifier.
    pub source: String,
    /// Sequence index within the source document.
    pub chunk_index: usize,
    pub content: String,
    pub embedding: Vec<f32>,
    pub indexed_at: DateTime<Utc>,
}

impl IndexEntry {
    /// Build an entry for `chunk` in `collection`.
    pub fn new(collection: &str, chunk: &Chunk, embedding: Vec<f32>) -> Self {
        Self {
            id: Self::key(collection, &chunk.source, chunk.index),
            collection: collection.to_string(),
            source: chunk.source.clone(),
            chunk_index: chunk.index,
            content: chunk.text.clone(),
            embedding,
            indexed_at: Utc::now(),
        }
    }

    /// Stable key of a chunk within a collection.
    pub fn key(collection: &str, source: &str, chunk_index: usize) -> Uuid {
        let name = format!("{}\u{1f}{}\u{1f}{}", collection, source, chunk_index);
        Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes())
    }
}

/// A search result with score.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub entry: IndexEntry,
    /// Cosine similarity (higher is better).
    pub score: f32,
}

/// Summary of a collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollectionInfo {
    pub name: String,
    /// Embedding model the collection was built with.
    pub embedding_model: String,
    pub dimensions: usize,
    pub entry_count: usize,
    pub created_at: DateTime<Utc>,
}

/// Trait for vector store implementations.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create `collection` for `embedding_model`, or confirm an existing one
    /// was built with the same model and vector size.
    async fn register_collection(
        &self,
        collection: &str,
        embedding_model: &str,
        dimensions: usize,
    ) -> Result<CollectionInfo>;

    /// Information about a collection, if it exists.
    async fn collection_info(&self, collection: &str) -> Result<Option<CollectionInfo>>;

    /// Insert or replace an entry. Its collection must be registered.
    async fn upsert(&self, entry: &IndexEntry) -> Result<()>;

    /// Bulk upsert entries.
    async fn upsert_batch(&self, entries: &[IndexEntry]) -> Result<usize>;

    /// Up to `limit` entries of `collection`, most similar first.
    async fn search(
        &self,
        collection: &str,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchResult>>;

    /// Search with a minimum similarity threshold.
    async fn search_with_threshold(
        &self,
        collection: &str,
        query_embedding: &[f32],
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<SearchResult>>;

    /// Number of entries in a collection.
    async fn count(&self, collection: &str) -> Result<usize>;

    /// All collections, by name.
    async fn list_collections(&self) -> Result<Vec<CollectionInfo>>;

    /// Remove a collection and its entries. Returns the number of entries removed.
    async fn delete_collection(&self, collection: &str) -> Result<usize>;
}

/// Open the store configured in `settings`.
pub fn open_store(settings: &Settings) -> Result<Arc<dyn VectorStore>> {
    match settings.vector_store.provider {
        VectorStoreProvider::Sqlite => Ok(Arc::new(SqliteVectorStore::new(&settings.sqlite_path())?)),
        VectorStoreProvider::Memory => Ok(Arc::new(MemoryVectorStore::new())),
    }
}

/// Check a registration request against an existing collection.
pub(crate) fn check_compatible(
    existing: &CollectionInfo,
    embedding_model: &str,
    dimensions: usize,
) -> Result<()> {
    if existing.embedding_model != embedding_model {
        return Err(DocqaError::EmbeddingModelMismatch {
            collection: existing.name.clone(),
            indexed: existing.embedding_model.clone(),
            requested: embedding_model.to_string(),
        });
    }
    if existing.dimensions != dimensions {
        return Err(DocqaError::VectorStore(format!(
            "collection '{}' holds {}-dimensional vectors, got {}",
            existing.name, existing.dimensions, dimensions
        )));
    }
    Ok(())
}

/// Sort by score descending and keep the best `limit`.
pub(crate) fn rank(mut results: Vec<SearchResult>, limit: usize) -> Vec<SearchResult> {
    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    results.truncate(limit);
    results
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
