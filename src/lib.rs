//! docqa - question answering over a folder of text documents
//!
//! Documents are split into overlapping chunks, embedded, and stored in a
//! local vector store. Questions are wrapped in a tone template, matched
//! against the store, and answered by a language model from the best
//! passages.
//!
//! # Architecture
//!
//! - `config` - Settings and prompt configuration
//! - `ingest` - Loading documents from the input directory
//! - `chunking` - Boundary-aware overlapping chunker
//! - `embedding` - Embedding generation
//! - `vector_store` - Collections of embedded chunks
//! - `indexer` - Embedding chunks into a collection
//! - `template` - Tone templates with strict field contracts
//! - `rag` - Retrieval and answer generation
//! - `llm` - Language-model access
//! - `orchestrator` - Indexing and the per-request query pipeline
//! - `transcription` - Spoken questions
//!
//! # Example
//!
//! ```rust,no_run
//! use docqa::config::Settings;
//! use docqa::orchestrator::{Orchestrator, QueryRequest};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!
//!     let result = orchestrator.index_directory(false).await?;
//!     println!("Indexed {} chunks", result.chunks_indexed);
//!
//!     let response = orchestrator
//!         .query(&QueryRequest::new("Where is the Eiffel Tower?"))
//!         .await;
//!     println!("{}", serde_json::to_string(&response)?);
//!
//!     Ok(())
//! }
//! ```

pub mod chunking;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod indexer;
pub mod ingest;
pub mod llm;
pub mod openai;
pub mod orchestrator;
pub mod rag;
pub mod template;
pub mod transcription;
pub mod vector_store;

#[cfg(test)]
mod testing;

pub use error::{DocqaError, Result};
