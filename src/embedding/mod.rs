//! Embedding generation for indexing and retrieval.

mod openai;

pub use openai::OpenAIEmbedder;

use crate::error::{DocqaError, Result};
use async_trait::async_trait;

/// Trait for embedding generation.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Name of the model producing the vectors. Indexes built with one model
    /// cannot be queried with another.
    fn model_name(&self) -> &str;
}

/// Reject responses that cannot be stored as a consistent set of vectors.
pub(crate) fn check_embeddings(
    embeddings: &[Vec<f32>],
    expected_count: usize,
    expected_dims: Option<usize>,
) -> Result<()> {
    if embeddings.len() != expected_count {
        return Err(DocqaError::EmbeddingFailure(format!(
            "expected {} embeddings, got {}",
            expected_count,
            embeddings.len()
        )));
    }

    let dims = expected_dims.or_else(|| embeddings.first().map(Vec::len));
    for (i, embedding) in embeddings.iter().enumerate() {
        if embedding.is_empty() {
            return Err(DocqaError::EmbeddingFailure(format!("embedding {} is empty", i)));
        }
        if Some(embedding.len()) != dims {
            return Err(DocqaError::EmbeddingFailure(format!(
                "embedding {} has {} dimensions, expected {}",
                i,
                embedding.len(),
                dims.unwrap_or_default()
            )));
        }
        if embedding.iter().any(|v| !v.is_finite()) {
            return Err(DocqaError::EmbeddingFailure(format!(
                "embedding {} contains non-finite values",
                i
            )));
        }
    }
    Ok(())
}
