//! Similarity search for a query.

use super::ContextChunk;
use crate::embedding::{check_embeddings, Embedder};
use crate::error::{DocqaError, Result};
use crate::vector_store::VectorStore;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Finds the chunks of a collection most similar to a query.
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
}

impl Retriever {
    /// `embedder` must be the model the searched collections were built with.
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>) -> Self {
        Self { embedder, store }
    }

    /// Up to `k` chunks of `collection`, most similar first.
    ///
    /// An unknown or empty collection yields no chunks. A collection built
    /// with a different embedding model is an `EmbeddingModelMismatch`, and a
    /// query vector that does not fit the collection is an `EmbeddingFailure`.
    #[instrument(skip(self, query), fields(collection = %collection, k = k))]
    pub async fn search(&self, query: &str, k: usize, collection: &str) -> Result<Vec<ContextChunk>> {
        if k == 0 {
            return Err(DocqaError::InvalidInput("k must be greater than 0".to_string()));
        }

        let Some(info) = self.store.collection_info(collection).await? else {
            debug!("Collection '{}' does not exist", collection);
            return Ok(Vec::new());
        };

        if info.embedding_model != self.embedder.model_name() {
            return Err(DocqaError::EmbeddingModelMismatch {
                collection: collection.to_string(),
                indexed: info.embedding_model,
                requested: self.embedder.model_name().to_string(),
            });
        }

        if info.entry_count == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed(query).await?;
        check_embeddings(std::slice::from_ref(&query_embedding), 1, Some(info.dimensions))?;
        let results = self.store.search(collection, &query_embedding, k).await?;

        debug!("Retrieved {} chunks", results.len());
        Ok(results.into_iter().take(k).map(ContextChunk::from).collect())
    }
}
