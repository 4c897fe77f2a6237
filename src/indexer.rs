//! Embedding chunks and writing them into a collection.

use crate::chunking::Chunk;
use crate::embedding::{check_embeddings, Embedder};
use crate::error::Result;
use crate::vector_store::{IndexEntry, VectorStore};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Default number of chunks embedded per request.
pub const DEFAULT_BATCH_SIZE: usize = 32;

/// Writes chunks and their embeddings into the vector store.
pub struct Indexer {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    batch_size: usize,
}

impl Indexer {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>) -> Self {
        Self {
            embedder,
            store,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Embed and upsert every chunk into `collection`. Returns the number written.
    ///
    /// The first embedding failure aborts the run. Entries already written stay
    /// in the store; since keys are derived from the chunk, re-running
    /// overwrites them instead of duplicating.
    pub async fn index<I>(&self, chunks: I, collection: &str) -> Result<usize>
    where
        I: IntoIterator<Item = Chunk>,
    {
        self.index_with_progress(chunks, collection, |_| {}).await
    }

    /// Like [`Indexer::index`], calling `on_progress` with the running total after each batch.
    #[instrument(skip(self, chunks, on_progress), fields(collection = %collection))]
    pub async fn index_with_progress<I, F>(
        &self,
        chunks: I,
        collection: &str,
        mut on_progress: F,
    ) -> Result<usize>
    where
        I: IntoIterator<Item = Chunk>,
        F: FnMut(usize),
    {
        let mut written = 0;
        let mut dimensions = None;
        let mut batch: Vec<Chunk> = Vec::with_capacity(self.batch_size);
        let mut chunks = chunks.into_iter();

        loop {
            batch.clear();
            batch.extend(chunks.by_ref().take(self.batch_size));
            if batch.is_empty() {
                break;
            }

            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let embeddings = self.embedder.embed_batch(&texts).await?;
            check_embeddings(&embeddings, batch.len(), dimensions)?;

            if dimensions.is_none() {
                let dims = embeddings[0].len();
                self.store
                    .register_collection(collection, self.embedder.model_name(), dims)
                    .await?;
                dimensions = Some(dims);
            }

            let entries: Vec<IndexEntry> = batch
                .iter()
                .zip(embeddings)
                .map(|(chunk, embedding)| IndexEntry::new(collection, chunk, embedding))
                .collect();

            written += self.store.upsert_batch(&entries).await?;
            debug!("Indexed {} chunks so far", written);
            on_progress(written);
        }

        info!("Indexed {} chunks into '{}'", written, collection);
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::{split_documents, ChunkingConfig};
    use crate::error::DocqaError;
    use crate::ingest::Document;
    use crate::testing::HashEmbedder;
    use crate::vector_store::{MemoryVectorStore, SqliteVectorStore};
    use tokio_test::{assert_err, assert_ok};

    fn documents() -> Vec<Document> {
        vec![
            Document::new("paris.txt", "The Eiffel Tower is in Paris. ".repeat(20)),
            Document::new("rome.txt", "The Colosseum is in Rome. ".repeat(20)),
        ]
    }

    #[tokio::test]
    async fn test_index_counts_chunks() {
        let store = Arc::new(MemoryVectorStore::new());
        let indexer = Indexer::new(Arc::new(HashEmbedder::new()), store.clone()).with_batch_size(2);
        let docs = documents();
        let config = ChunkingConfig::new(200, 40).unwrap();
        let expected = split_documents(&docs, config).count();

        let mut progress = Vec::new();
        let written = indexer
            .index_with_progress(split_documents(&docs, config), "docs", |n| progress.push(n))
            .await
            .unwrap();

        assert_eq!(written, expected);
        assert_eq!(store.count("docs").await.unwrap(), expected);
        assert_eq!(progress.last(), Some(&expected));

        let info = store.collection_info("docs").await.unwrap().unwrap();
        assert_eq!(info.embedding_model, "hash-embed");
    }

    #[tokio::test]
    async fn test_reindexing_is_idempotent() {
        let store = Arc::new(SqliteVectorStore::in_memory().unwrap());
        let indexer = Indexer::new(Arc::new(HashEmbedder::new()), store.clone());
        let docs = documents();
        let config = ChunkingConfig::new(200, 40).unwrap();

        let first = indexer.index(split_documents(&docs, config), "docs").await.unwrap();
        let count = store.count("docs").await.unwrap();
        let second = indexer.index(split_documents(&docs, config), "docs").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(store.count("docs").await.unwrap(), count);
    }

    #[tokio::test]
    async fn test_embedding_failure_aborts_run() {
        let store = Arc::new(MemoryVectorStore::new());
        let indexer = Indexer::new(Arc::new(HashEmbedder::failing_after(1)), store.clone())
            .with_batch_size(1);
        let docs = documents();

        let err = indexer
            .index(split_documents(&docs, ChunkingConfig::new(100, 10).unwrap()), "docs")
            .await
            .unwrap_err();

        assert!(matches!(err, DocqaError::EmbeddingFailure(_)));
        // Only the batch embedded before the failure was written.
        assert_eq!(store.count("docs").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_index_rejects_collection_built_with_other_model() {
        let store = Arc::new(MemoryVectorStore::new());
        let docs = documents();
        let config = ChunkingConfig::default();

        Indexer::new(Arc::new(HashEmbedder::with_model("a")), store.clone())
            .index(split_documents(&docs, config), "docs")
            .await
            .unwrap();
        let err = assert_err!(
            Indexer::new(Arc::new(HashEmbedder::with_model("b")), store.clone())
                .index(split_documents(&docs, config), "docs")
                .await
        );

        assert!(matches!(err, DocqaError::EmbeddingModelMismatch { .. }));
    }

    #[tokio::test]
    async fn test_index_nothing() {
        let store = Arc::new(MemoryVectorStore::new());
        let indexer = Indexer::new(Arc::new(HashEmbedder::new()), store.clone());
        let written = assert_ok!(indexer.index(Vec::new(), "docs").await);
        assert_eq!(written, 0);
        assert!(assert_ok!(store.collection_info("docs").await).is_none());
    }
}
