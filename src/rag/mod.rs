//! Retrieval and answer generation over an indexed collection.

mod answerer;
mod retriever;

pub use answerer::Answerer;
pub use retriever::Retriever;

use crate::vector_store::SearchResult;
use serde::Serialize;

/// A retrieved chunk with its similarity to the query.
#[derive(Debug, Clone, Serialize)]
pub struct ContextChunk {
    /// Source document identifier.
    pub source: String,
    /// Sequence index within the source document.
    pub chunk_index: usize,
    pub content: String,
    pub score: f32,
}

impl From<SearchResult> for ContextChunk {
    fn from(result: SearchResult) -> Self {
        Self {
            source: result.entry.source,
            chunk_index: result.entry.chunk_index,
            content: result.entry.content,
            score: result.score,
        }
    }
}

/// Join chunk texts, in retrieval order, into one context block.
pub fn format_context(chunks: &[ContextChunk]) -> String {
    chunks
        .iter()
        .map(|chunk| chunk.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}
