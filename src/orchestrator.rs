//! Pipeline orchestrator for docqa.
//!
//! Coordinates indexing (documents to vector store) and query answering
//! (template, retrieval, generation). Queries never fail at this boundary:
//! every error becomes a structured [`QueryResponse::Error`].

use crate::chunking::{split_documents, ChunkingConfig};
use crate::config::{AnswerInput, Prompts, Settings};
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::{DocqaError, Result};
use crate::indexer::Indexer;
use crate::ingest::{load_documents, Document};
use crate::llm::{Generator, OpenAIGenerator};
use crate::rag::{Answerer, ContextChunk, Retriever};
use crate::template::{TemplateRegistry, QUESTION_FIELD};
use crate::vector_store::{open_store, VectorStore};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// A question to answer.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct QueryRequest {
    #[serde(default)]
    pub question: Option<String>,
    /// Falls back to `rag.default_template` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_name: Option<String>,
}

impl QueryRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: Some(question.into()),
            template_name: None,
        }
    }

    pub fn with_template(mut self, template_name: impl Into<String>) -> Self {
        self.template_name = Some(template_name.into());
        self
    }
}

/// Outcome of a query: an answer or an error message, never both.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum QueryResponse {
    Answer { answer: String },
    Error { error: String },
}

impl QueryResponse {
    pub fn is_error(&self) -> bool {
        matches!(self, QueryResponse::Error { .. })
    }

    /// The answer text, if the query succeeded.
    pub fn answer(&self) -> Option<&str> {
        match self {
            QueryResponse::Answer { answer } => Some(answer),
            QueryResponse::Error { .. } => None,
        }
    }
}

impl From<Result<String>> for QueryResponse {
    fn from(result: Result<String>) -> Self {
        match result {
            Ok(answer) => QueryResponse::Answer { answer },
            Err(e) => QueryResponse::Error { error: e.to_string() },
        }
    }
}

/// An answer together with the chunks it was generated from.
#[derive(Debug, Clone, Serialize)]
pub struct QueryAnswer {
    pub answer: String,
    /// Retrieved context, most similar first.
    pub sources: Vec<ContextChunk>,
}

/// Where a query is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStage {
    Received,
    TemplateResolved,
    Rendered,
    Retrieved,
    Answered,
    Responded,
    Failed,
}

impl fmt::Display for QueryStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QueryStage::Received => "received",
            QueryStage::TemplateResolved => "template_resolved",
            QueryStage::Rendered => "rendered",
            QueryStage::Retrieved => "retrieved",
            QueryStage::Answered => "answered",
            QueryStage::Responded => "responded",
            QueryStage::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// Result of indexing a directory.
#[derive(Debug, Clone, Serialize)]
pub struct IndexResult {
    /// Documents loaded.
    pub documents: usize,
    /// Chunks embedded and written.
    pub chunks_indexed: usize,
    pub collection: String,
}

/// The main orchestrator for docqa.
pub struct Orchestrator {
    settings: Settings,
    registry: TemplateRegistry,
    store: Arc<dyn VectorStore>,
    indexer: Indexer,
    retriever: Retriever,
    answerer: Answerer,
}

impl Orchestrator {
    /// Create an orchestrator talking to the configured model endpoint and store.
    pub fn new(settings: Settings) -> Result<Self> {
        settings.validate()?;

        let prompts = Prompts::load(settings.templates_file().as_deref())?;
        let embedder: Arc<dyn Embedder> =
            Arc::new(OpenAIEmbedder::new(&settings.llm, &settings.embedding)?);
        let generator: Arc<dyn Generator> =
            Arc::new(OpenAIGenerator::new(&settings.llm, &settings.rag)?);
        let store = open_store(&settings)?;

        info!(
            "Using embedding model {} and language model {}",
            embedder.model_name(),
            generator.model_name()
        );

        Self::with_components(settings, prompts, embedder, generator, store)
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        prompts: Prompts,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
        store: Arc<dyn VectorStore>,
    ) -> Result<Self> {
        let registry = TemplateRegistry::from_prompts(&prompts)?;
        if !registry.contains(&settings.rag.default_template) {
            return Err(DocqaError::Config(format!(
                "Default template '{}' is not registered",
                settings.rag.default_template
            )));
        }

        let indexer = Indexer::new(embedder.clone(), store.clone())
            .with_batch_size(settings.embedding.batch_size);
        let retriever = Retriever::new(embedder, store.clone());
        let answerer = Answerer::new(generator).with_prompts(prompts.answer);

        Ok(Self {
            settings,
            registry,
            store,
            indexer,
            retriever,
            answerer,
        })
    }

    /// Get the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The frozen template registry.
    pub fn registry(&self) -> &TemplateRegistry {
        &self.registry
    }

    /// Get a reference to the vector store.
    pub fn store(&self) -> Arc<dyn VectorStore> {
        self.store.clone()
    }

    /// Name of the collection queries and indexing use.
    pub fn collection(&self) -> &str {
        &self.settings.vector_store.collection
    }

    /// Load every document in the input directory and index it.
    pub async fn index_directory(&self, reset: bool) -> Result<IndexResult> {
        let documents = load_documents(&self.settings.input_dir(), &self.settings.ingest.extension)?;
        self.index_documents(&documents, reset, |_| {}).await
    }

    /// Chunk, embed, and write `documents` into the configured collection.
    ///
    /// With `reset`, the collection is dropped first. An embedding failure
    /// aborts the run.
    #[instrument(skip(self, documents, on_progress), fields(documents = documents.len()))]
    pub async fn index_documents<F>(
        &self,
        documents: &[Document],
        reset: bool,
        on_progress: F,
    ) -> Result<IndexResult>
    where
        F: FnMut(usize),
    {
        let collection = self.collection();
        if reset {
            let removed = self.store.delete_collection(collection).await?;
            info!("Removed {} entries from '{}'", removed, collection);
        }

        let config = ChunkingConfig::try_from(&self.settings.chunking)?;
        let chunks_indexed = self
            .indexer
            .index_with_progress(split_documents(documents, config), collection, on_progress)
            .await?;

        Ok(IndexResult {
            documents: documents.len(),
            chunks_indexed,
            collection: collection.to_string(),
        })
    }

    /// Retrieve the chunks most similar to `query`, without generating an answer.
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<ContextChunk>> {
        self.retriever.search(query, limit, self.collection()).await
    }

    /// Answer a request. Failures are reported in the response, never returned.
    pub async fn query(&self, request: &QueryRequest) -> QueryResponse {
        let mut stage = QueryStage::Received;
        debug!(stage = %stage, "Query received");

        let result = self
            .run_query(request, &mut stage)
            .await
            .map(|answer| answer.answer);
        match &result {
            Ok(_) => advance(&mut stage, QueryStage::Responded),
            Err(e) => {
                warn!(stage = %stage, "Query failed: {}", e);
                advance(&mut stage, QueryStage::Failed);
            }
        }
        result.into()
    }

    /// Answer a request, keeping the retrieved sources and the failure kind.
    pub async fn try_query(&self, request: &QueryRequest) -> Result<QueryAnswer> {
        let mut stage = QueryStage::Received;
        self.run_query(request, &mut stage).await
    }

    #[instrument(skip(self, request, stage))]
    async fn run_query(&self, request: &QueryRequest, stage: &mut QueryStage) -> Result<QueryAnswer> {
        let question = request
            .question
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .ok_or(DocqaError::MissingQuestion)?;

        let template_name = request
            .template_name
            .as_deref()
            .unwrap_or(&self.settings.rag.default_template);
        let template = self.registry.resolve(template_name)?;
        advance(stage, QueryStage::TemplateResolved);

        let mut inputs = HashMap::new();
        inputs.insert(QUESTION_FIELD.to_string(), question.to_string());
        let rendered = template.render(&inputs)?;
        advance(stage, QueryStage::Rendered);

        let context = self
            .retriever
            .search(&rendered, self.settings.rag.top_k, self.collection())
            .await?;
        advance(stage, QueryStage::Retrieved);

        let answer_input = match self.settings.rag.answer_input {
            AnswerInput::Rendered => rendered.as_str(),
            AnswerInput::Question => question,
        };
        let answer = self.answerer.answer(answer_input, &context).await?;
        advance(stage, QueryStage::Answered);

        Ok(QueryAnswer {
            answer,
            sources: context,
        })
    }
}

fn advance(stage: &mut QueryStage, next: QueryStage) {
    debug!(from = %stage, to = %next, "Query stage");
    *stage = next;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TemplateDefinition;
    use crate::testing::{EchoGenerator, HashEmbedder};
    use crate::vector_store::{MemoryVectorStore, SqliteVectorStore};
    use tempfile::TempDir;
    use tokio_test::{assert_err, assert_ok};

    struct Fixture {
        orchestrator: Orchestrator,
        generator: Arc<EchoGenerator>,
        store: Arc<dyn VectorStore>,
    }

    fn fixture_with(
        settings: Settings,
        embedder: HashEmbedder,
        generator: EchoGenerator,
        store: Arc<dyn VectorStore>,
    ) -> Fixture {
        let generator = Arc::new(generator);
        let orchestrator = Orchestrator::with_components(
            settings,
            Prompts::default(),
            Arc::new(embedder),
            generator.clone(),
            store.clone(),
        )
        .unwrap();
        Fixture {
            orchestrator,
            generator,
            store,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(
            Settings::default(),
            HashEmbedder::new(),
            EchoGenerator::new(),
            Arc::new(MemoryVectorStore::new()),
        )
    }

    fn eiffel() -> Vec<Document> {
        vec![Document::new("paris.txt", "The Eiffel Tower is in Paris.")]
    }

    #[tokio::test]
    async fn test_end_to_end_answer() {
        let f = fixture();
        f.orchestrator.index_documents(&eiffel(), false, |_| {}).await.unwrap();

        let response = f
            .orchestrator
            .query(&QueryRequest::new("Where is the Eiffel Tower?"))
            .await;

        let answer = response.answer().expect("expected an answer");
        assert!(!answer.is_empty());

        let prompt = f.generator.last_user_prompt().unwrap();
        assert!(prompt.contains("The Eiffel Tower is in Paris."));
        assert!(prompt.contains("Where is the Eiffel Tower?"));
    }

    #[tokio::test]
    async fn test_empty_question_is_an_error_response() {
        let f = fixture();
        f.orchestrator.index_documents(&eiffel(), false, |_| {}).await.unwrap();

        for request in [QueryRequest::new(""), QueryRequest::new("   "), QueryRequest::default()] {
            match f.orchestrator.query(&request).await {
                QueryResponse::Error { error } => {
                    assert!(error.to_lowercase().contains("question"), "{}", error)
                }
                other => panic!("expected an error, got {:?}", other),
            }
        }
        assert_eq!(f.generator.calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_sources_are_the_chunks_the_model_saw() {
        let f = fixture();
        let docs = vec![
            Document::new("paris.txt", "The Eiffel Tower is in Paris."),
            Document::new("rome.txt", "The Colosseum is in Rome."),
        ];
        f.orchestrator.index_documents(&docs, false, |_| {}).await.unwrap();

        let result = f
            .orchestrator
            .try_query(&QueryRequest::new("Where is the Eiffel Tower?"))
            .await
            .unwrap();

        let rendered = f
            .orchestrator
            .registry()
            .render(
                "professional",
                &HashMap::from([(QUESTION_FIELD.to_string(), "Where is the Eiffel Tower?".to_string())]),
            )
            .unwrap();
        let expected = f.orchestrator.search(&rendered, 4).await.unwrap();

        assert_eq!(result.sources.len(), 2);
        assert_eq!(
            result.sources.iter().map(|c| &c.source).collect::<Vec<_>>(),
            expected.iter().map(|c| &c.source).collect::<Vec<_>>()
        );
        let prompt = f.generator.last_user_prompt().unwrap();
        assert!(result.sources.iter().all(|c| prompt.contains(&c.content)));
    }

    #[tokio::test]
    async fn test_unknown_template() {
        let f = fixture();
        let request = QueryRequest::new("Where?").with_template("sarcastic");

        let err = assert_err!(f.orchestrator.try_query(&request).await);
        assert!(matches!(err, DocqaError::TemplateNotFound(ref name) if name == "sarcastic"));

        let response = f.orchestrator.query(&request).await;
        assert!(response.is_error());
    }

    #[tokio::test]
    async fn test_template_choice_shapes_prompt() {
        let f = fixture();
        f.orchestrator.index_documents(&eiffel(), false, |_| {}).await.unwrap();

        let request = QueryRequest::new("Where is the Eiffel Tower?").with_template("short_answer");
        f.orchestrator.try_query(&request).await.unwrap();

        let prompt = f.generator.last_user_prompt().unwrap();
        assert!(prompt.contains("single sentence"));
    }

    #[tokio::test]
    async fn test_answer_with_raw_question() {
        let mut settings = Settings::default();
        settings.rag.answer_input = AnswerInput::Question;
        let f = fixture_with(
            settings,
            HashEmbedder::new(),
            EchoGenerator::new(),
            Arc::new(MemoryVectorStore::new()),
        );
        f.orchestrator.index_documents(&eiffel(), false, |_| {}).await.unwrap();

        f.orchestrator
            .try_query(&QueryRequest::new("Where is the Eiffel Tower?"))
            .await
            .unwrap();

        let prompt = f.generator.last_user_prompt().unwrap();
        assert!(prompt.contains("Question: Where is the Eiffel Tower?\n"));
        assert!(!prompt.contains("bulleted"));
    }

    #[tokio::test]
    async fn test_generation_failure_becomes_error_response() {
        let f = fixture_with(
            Settings::default(),
            HashEmbedder::new(),
            EchoGenerator::failing(),
            Arc::new(MemoryVectorStore::new()),
        );
        f.orchestrator.index_documents(&eiffel(), false, |_| {}).await.unwrap();

        let response = f.orchestrator.query(&QueryRequest::new("Where?")).await;
        match response {
            QueryResponse::Error { error } => assert!(error.contains("model timed out")),
            other => panic!("expected an error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_query_against_empty_store_still_answers() {
        let f = fixture();
        let response = f.orchestrator.query(&QueryRequest::new("Where?")).await;
        assert!(!response.is_error());
    }

    #[tokio::test]
    async fn test_reindexing_keeps_count() {
        let f = fixture_with(
            Settings::default(),
            HashEmbedder::new(),
            EchoGenerator::new(),
            Arc::new(SqliteVectorStore::in_memory().unwrap()),
        );
        let docs = vec![
            Document::new("a.txt", "Lorem ipsum dolor sit amet. ".repeat(100)),
            Document::new("b.txt", "The Eiffel Tower is in Paris."),
        ];

        let first = f.orchestrator.index_documents(&docs, false, |_| {}).await.unwrap();
        let count = f.store.count(f.orchestrator.collection()).await.unwrap();
        let second = f.orchestrator.index_documents(&docs, false, |_| {}).await.unwrap();

        assert_eq!(first.chunks_indexed, second.chunks_indexed);
        assert_eq!(first.chunks_indexed, count);
        assert_eq!(f.store.count(f.orchestrator.collection()).await.unwrap(), count);
    }

    #[tokio::test]
    async fn test_reset_drops_stale_entries() {
        let f = fixture();
        let long = vec![Document::new("a.txt", "Lorem ipsum dolor sit amet. ".repeat(100))];
        let short = vec![Document::new("a.txt", "Short now.")];

        f.orchestrator.index_documents(&long, false, |_| {}).await.unwrap();
        f.orchestrator.index_documents(&short, true, |_| {}).await.unwrap();

        assert_eq!(f.store.count(f.orchestrator.collection()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_embedding_failure_aborts_indexing() {
        let f = fixture_with(
            Settings::default(),
            HashEmbedder::failing_after(0),
            EchoGenerator::new(),
            Arc::new(MemoryVectorStore::new()),
        );

        let err = f
            .orchestrator
            .index_documents(&eiffel(), false, |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, DocqaError::EmbeddingFailure(_)));
    }

    #[tokio::test]
    async fn test_index_directory() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("paris.txt"), "The Eiffel Tower is in Paris.").unwrap();
        std::fs::write(dir.path().join("notes.md"), "ignored").unwrap();

        let mut settings = Settings::default();
        settings.ingest.input_dir = dir.path().to_string_lossy().to_string();
        let f = fixture_with(
            settings,
            HashEmbedder::new(),
            EchoGenerator::new(),
            Arc::new(MemoryVectorStore::new()),
        );

        let result = assert_ok!(f.orchestrator.index_directory(false).await);
        assert_eq!(result.documents, 1);
        assert_eq!(result.chunks_indexed, 1);
        assert_eq!(result.collection, "multi_txt_docs");
    }

    #[tokio::test]
    async fn test_index_missing_directory() {
        let mut settings = Settings::default();
        settings.ingest.input_dir = "/nonexistent/docqa/input".to_string();
        let f = fixture_with(
            settings,
            HashEmbedder::new(),
            EchoGenerator::new(),
            Arc::new(MemoryVectorStore::new()),
        );

        let err = f.orchestrator.index_directory(false).await.unwrap_err();
        assert!(matches!(err, DocqaError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_retrieval_bound() {
        let f = fixture();
        let docs: Vec<Document> = (0..10)
            .map(|i| Document::new(format!("doc{}.txt", i), format!("Tower number {} is tall.", i)))
            .collect();
        f.orchestrator.index_documents(&docs, false, |_| {}).await.unwrap();

        let results = f.orchestrator.search("Which tower is tall?", 3).await.unwrap();
        assert_eq!(results.len(), 3);
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[tokio::test]
    async fn test_custom_template_from_prompts() {
        let mut prompts = Prompts::default();
        prompts.templates.push(TemplateDefinition {
            name: "pirate".to_string(),
            fields: vec!["raw_question".to_string()],
            format: "Answer like a pirate: {raw_question}".to_string(),
        });
        let generator = Arc::new(EchoGenerator::new());
        let orchestrator = Orchestrator::with_components(
            Settings::default(),
            prompts,
            Arc::new(HashEmbedder::new()),
            generator.clone(),
            Arc::new(MemoryVectorStore::new()),
        )
        .unwrap();

        orchestrator
            .try_query(&QueryRequest::new("Where?").with_template("pirate"))
            .await
            .unwrap();
        assert!(generator.last_user_prompt().unwrap().contains("Answer like a pirate: Where?"));
    }

    #[test]
    fn test_unknown_default_template_is_config_error() {
        let mut settings = Settings::default();
        settings.rag.default_template = "sarcastic".to_string();

        let result = Orchestrator::with_components(
            settings,
            Prompts::default(),
            Arc::new(HashEmbedder::new()),
            Arc::new(EchoGenerator::new()),
            Arc::new(MemoryVectorStore::new()),
        );
        assert!(matches!(result, Err(DocqaError::Config(_))));
    }

    #[test]
    fn test_request_and_response_json() {
        let request: QueryRequest =
            serde_json::from_str(r#"{"question": "Why?", "template_name": "friendly"}"#).unwrap();
        assert_eq!(request, QueryRequest::new("Why?").with_template("friendly"));

        let request: QueryRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(request.question, None);

        let answer = serde_json::to_value(QueryResponse::Answer { answer: "Paris".into() }).unwrap();
        assert_eq!(answer, serde_json::json!({"answer": "Paris"}));

        let error = serde_json::to_value(QueryResponse::Error { error: "nope".into() }).unwrap();
        assert_eq!(error, serde_json::json!({"error": "nope"}));
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(QueryStage::TemplateResolved.to_string(), "template_resolved");
        assert_eq!(QueryStage::Failed.to_string(), "failed");
    }
}
