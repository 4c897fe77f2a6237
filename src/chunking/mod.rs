//! Splitting documents into overlapping chunks for embedding.
//!
//! Sizes are measured in characters, not bytes, so multi-byte text (e.g.
//! Chinese) is cut on character boundaries.

mod recursive;

pub use recursive::{Boundary, ChunkIter, RecursiveChunker};

use crate::config::ChunkingSettings;
use crate::error::{DocqaError, Result};
use crate::ingest::Document;
use serde::{Deserialize, Serialize};

/// A segment of exactly one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Identifier of the source document.
    pub source: String,
    /// Position of this chunk within its document, starting at 0.
    pub index: usize,
    /// Offset of the first character within the document text.
    pub start: usize,
    /// Length of `text` in characters.
    pub char_len: usize,
    pub text: String,
}

impl Chunk {
    pub fn new(source: &str, index: usize, start: usize, text: String) -> Self {
        Self {
            source: source.to_string(),
            index,
            start,
            char_len: text.chars().count(),
            text,
        }
    }

    /// Offset one past the last character.
    pub fn end(&self) -> usize {
        self.start + self.char_len
    }
}

/// Chunk size and overlap, in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl ChunkingConfig {
    /// Requires `chunk_size > 0` and `chunk_overlap < chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(DocqaError::InvalidInput("chunk_size must be greater than 0".to_string()));
        }
        if chunk_overlap >= chunk_size {
            return Err(DocqaError::InvalidInput(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunk_overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

impl TryFrom<&ChunkingSettings> for ChunkingConfig {
    type Error = DocqaError;

    fn try_from(settings: &ChunkingSettings) -> Result<Self> {
        Self::new(settings.chunk_size, settings.chunk_overlap)
    }
}

/// Lazily chunk `documents` in input order.
pub fn split_documents<'a>(
    documents: &'a [Document],
    config: ChunkingConfig,
) -> impl Iterator<Item = Chunk> + 'a {
    let chunker = RecursiveChunker::new(config);
    documents.iter().flat_map(move |doc| chunker.chunks(doc))
}
