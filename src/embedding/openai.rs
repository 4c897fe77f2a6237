//! Embeddings over an OpenAI-compatible API (Ollama by default).

use super::{check_embeddings, Embedder};
use crate::config::{EmbeddingSettings, LlmSettings};
use crate::error::{DocqaError, Result};
use crate::openai::create_client;
use async_openai::types::{CreateEmbeddingRequestArgs, EmbeddingInput};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Embedder backed by the `/embeddings` endpoint.
pub struct OpenAIEmbedder {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    dimensions: Option<u32>,
    batch_size: usize,
}

impl OpenAIEmbedder {
    /// Create an embedder from settings.
    pub fn new(llm: &LlmSettings, embedding: &EmbeddingSettings) -> Result<Self> {
        Ok(Self {
            client: create_client(llm)?,
            model: embedding.model.clone(),
            dimensions: embedding.dimensions,
            batch_size: embedding.batch_size.max(1),
        })
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    #[instrument(skip(self, text))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.embed_batch(&[text.to_string()]).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| DocqaError::EmbeddingFailure("Empty embedding response".to_string()))
    }

    #[instrument(skip(self, texts), fields(count = texts.len(), model = %self.model))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts", texts.len());

        let mut all_embeddings = Vec::with_capacity(texts.len());

        for chunk in texts.chunks(self.batch_size) {
            let mut args = CreateEmbeddingRequestArgs::default();
            args.model(&self.model)
                .input(EmbeddingInput::StringArray(chunk.to_vec()));
            if let Some(dims) = self.dimensions {
                args.dimensions(dims);
            }
            let request = args
                .build()
                .map_err(|e| DocqaError::EmbeddingFailure(format!("Failed to build request: {}", e)))?;

            let response = self.client.embeddings().create(request).await.map_err(|e| {
                DocqaError::EmbeddingFailure(format!("Embedding API error: {}", e))
            })?;

            // Sort by index to ensure correct order
            let mut embeddings: Vec<_> = response.data.into_iter().collect();
            embeddings.sort_by_key(|e| e.index);

            let vectors: Vec<Vec<f32>> = embeddings.into_iter().map(|e| e.embedding).collect();
            check_embeddings(&vectors, chunk.len(), self.dimensions.map(|d| d as usize))?;
            all_embeddings.extend(vectors);
        }

        // Every batch must agree with the first one.
        check_embeddings(&all_embeddings, texts.len(), None)?;

        debug!("Generated {} embeddings", all_embeddings.len());
        Ok(all_embeddings)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedder_creation() {
        let embedder =
            OpenAIEmbedder::new(&LlmSettings::default(), &EmbeddingSettings::default()).unwrap();
        assert_eq!(embedder.model_name(), "mistral");
        assert_eq!(embedder.batch_size, 32);
        assert!(embedder.dimensions.is_none());
    }
}
