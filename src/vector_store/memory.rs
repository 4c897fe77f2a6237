//! In-memory vector store implementation.
//!
//! Useful for testing and small datasets.

use super::{
    check_compatible, cosine_similarity, rank, CollectionInfo, IndexEntry, SearchResult,
    VectorStore,
};
use crate::error::{DocqaError, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

struct Collection {
    info: CollectionInfo,
    entries: HashMap<Uuid, IndexEntry>,
}

/// In-memory vector store.
pub struct MemoryVectorStore {
    collections: RwLock<BTreeMap<String, Collection>>,
}

impl MemoryVectorStore {
    /// Create a new in-memory vector store.
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(BTreeMap::new()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<String, Collection>>> {
        self.collections
            .read()
            .map_err(|e| DocqaError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<String, Collection>>> {
        self.collections
            .write()
            .map_err(|e| DocqaError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    fn insert(collections: &mut BTreeMap<String, Collection>, entry: &IndexEntry) -> Result<()> {
        let collection = collections.get_mut(&entry.collection).ok_or_else(|| {
            DocqaError::VectorStore(format!("collection '{}' is not registered", entry.collection))
        })?;
        if entry.embedding.len() != collection.info.dimensions {
            return Err(DocqaError::VectorStore(format!(
                "collection '{}' holds {}-dimensional vectors, got {}",
                entry.collection,
                collection.info.dimensions,
                entry.embedding.len()
            )));
        }
        collection.entries.insert(entry.id, entry.clone());
        Ok(())
    }

    fn info_of(collection: &Collection) -> CollectionInfo {
        CollectionInfo {
            entry_count: collection.entries.len(),
            ..collection.info.clone()
        }
    }
}

impl Default for MemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn register_collection(
        &self,
        collection: &str,
        embedding_model: &str,
        dimensions: usize,
    ) -> Result<CollectionInfo> {
        let mut collections = self.write()?;
        if let Some(existing) = collections.get(collection) {
            let info = Self::info_of(existing);
            check_compatible(&info, embedding_model, dimensions)?;
            return Ok(info);
        }

        let info = CollectionInfo {
            name: collection.to_string(),
            embedding_model: embedding_model.to_string(),
            dimensions,
            entry_count: 0,
            created_at: Utc::now(),
        };
        collections.insert(
            collection.to_string(),
            Collection {
                info: info.clone(),
                entries: HashMap::new(),
            },
        );
        Ok(info)
    }

    async fn collection_info(&self, collection: &str) -> Result<Option<CollectionInfo>> {
        Ok(self.read()?.get(collection).map(Self::info_of))
    }

    async fn upsert(&self, entry: &IndexEntry) -> Result<()> {
        let mut collections = self.write()?;
        Self::insert(&mut collections, entry)
    }

    async fn upsert_batch(&self, entries: &[IndexEntry]) -> Result<usize> {
        let mut collections = self.write()?;
        for entry in entries {
            Self::insert(&mut collections, entry)?;
        }
        Ok(entries.len())
    }

    async fn search(
        &self,
        collection: &str,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchResult>> {
        self.search_with_threshold(collection, query_embedding, limit, f32::MIN)
            .await
    }

    async fn search_with_threshold(
        &self,
        collection: &str,
        query_embedding: &[f32],
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<SearchResult>> {
        let collections = self.read()?;
        let Some(collection) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        let results: Vec<SearchResult> = collection
            .entries
            .values()
            .map(|entry| SearchResult {
                score: cosine_similarity(query_embedding, &entry.embedding),
                entry: entry.clone(),
            })
            .filter(|r| r.score >= min_score)
            .collect();

        Ok(rank(results, limit))
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        Ok(self
            .read()?
            .get(collection)
            .map(|c| c.entries.len())
            .unwrap_or(0))
    }

    async fn list_collections(&self) -> Result<Vec<CollectionInfo>> {
        Ok(self.read()?.values().map(Self::info_of).collect())
    }

    async fn delete_collection(&self, collection: &str) -> Result<usize> {
        Ok(self
            .write()?
            .remove(collection)
            .map(|c| c.entries.len())
            .unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::Chunk;

    fn entry(collection: &str, source: &str, index: usize, embedding: Vec<f32>) -> IndexEntry {
        let chunk = Chunk::new(source, index, 0, format!("{source} #{index}"));
        IndexEntry::new(collection, &chunk, embedding)
    }

    #[tokio::test]
    async fn test_memory_vector_store() {
        let store = MemoryVectorStore::new();
        store.register_collection("docs", "mistral", 3).await.unwrap();

        store
            .upsert_batch(&[
                entry("docs", "a.txt", 0, vec![1.0, 0.0, 0.0]),
                entry("docs", "a.txt", 1, vec![0.0, 1.0, 0.0]),
            ])
            .await
            .unwrap();

        assert_eq!(store.count("docs").await.unwrap(), 2);

        let results = store.search("docs", &[1.0, 0.0, 0.0], 10).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].score > results[1].score);
        assert_eq!(results[0].entry.chunk_index, 0);

        let collections = store.list_collections().await.unwrap();
        assert_eq!(collections.len(), 1);
        assert_eq!(collections[0].entry_count, 2);
    }

    #[tokio::test]
    async fn test_collections_are_isolated() {
        let store = MemoryVectorStore::new();
        store.register_collection("x", "m", 2).await.unwrap();
        store.register_collection("y", "m", 2).await.unwrap();
        store.upsert(&entry("x", "a.txt", 0, vec![1.0, 0.0])).await.unwrap();
        store.upsert(&entry("y", "b.txt", 0, vec![1.0, 0.0])).await.unwrap();

        let results = store.search("x", &[1.0, 0.0], 10).await.unwrap();
        assert_eq!(results.len(), 1);
        assert!(results.iter().all(|r| r.entry.collection == "x"));
        assert!(store.search("missing", &[1.0, 0.0], 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upsert_overwrites_same_chunk() {
        let store = MemoryVectorStore::new();
        store.register_collection("docs", "m", 2).await.unwrap();
        store.upsert(&entry("docs", "a.txt", 0, vec![1.0, 0.0])).await.unwrap();
        store.upsert(&entry("docs", "a.txt", 0, vec![0.0, 1.0])).await.unwrap();
        assert_eq!(store.count("docs").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_register_rejects_other_model_and_unregistered_upsert() {
        let store = MemoryVectorStore::new();
        store.register_collection("docs", "mistral", 2).await.unwrap();
        let err = store.register_collection("docs", "nomic", 2).await.unwrap_err();
        assert!(matches!(err, DocqaError::EmbeddingModelMismatch { .. }));

        let err = store.upsert(&entry("nope", "a.txt", 0, vec![1.0, 0.0])).await.unwrap_err();
        assert!(matches!(err, DocqaError::VectorStore(_)));

        let err = store.upsert(&entry("docs", "a.txt", 0, vec![1.0])).await.unwrap_err();
        assert!(matches!(err, DocqaError::VectorStore(_)));
    }

    #[tokio::test]
    async fn test_delete_collection() {
        let store = MemoryVectorStore::new();
        store.register_collection("docs", "m", 2).await.unwrap();
        store.upsert(&entry("docs", "a.txt", 0, vec![1.0, 0.0])).await.unwrap();
        assert_eq!(store.delete_collection("docs").await.unwrap(), 1);
        assert!(store.collection_info("docs").await.unwrap().is_none());
    }
}
