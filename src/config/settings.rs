//! Configuration settings for docqa.

use crate::error::{DocqaError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub llm: LlmSettings,
    pub embedding: EmbeddingSettings,
    pub chunking: ChunkingSettings,
    pub ingest: IngestSettings,
    pub vector_store: VectorStoreSettings,
    pub rag: RagSettings,
    pub prompts: PromptSettings,
    pub server: ServerSettings,
    pub transcription: TranscriptionSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.docqa".to_string(),
            log_level: "warn".to_string(),
        }
    }
}

/// Connection settings for the OpenAI-compatible model endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Base URL of the API (Ollama exposes one under `/v1`).
    pub api_base: String,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_base: "http://localhost:11434/v1".to_string(),
            timeout_seconds: crate::openai::DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding model to use.
    pub model: String,
    /// Requested dimensions. Leave unset for models with a fixed size.
    pub dimensions: Option<u32>,
    /// Number of chunks sent per embedding request.
    pub batch_size: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: "mistral".to_string(),
            dimensions: None,
            batch_size: 32,
        }
    }
}

/// Text chunking settings. Sizes are in characters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

/// Where documents are read from at indexing time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    /// Directory scanned (non-recursively) for documents.
    pub input_dir: String,
    /// File extension to include, without the dot.
    pub extension: String,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            input_dir: "./Txt".to_string(),
            extension: "txt".to_string(),
        }
    }
}

/// Vector store backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VectorStoreProvider {
    #[default]
    Sqlite,
    Memory,
}

/// Vector store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreSettings {
    pub provider: VectorStoreProvider,
    /// Path to SQLite database (for sqlite provider).
    pub sqlite_path: String,
    /// Collection that indexing writes to and queries read from.
    pub collection: String,
}

impl Default for VectorStoreSettings {
    fn default() -> Self {
        Self {
            provider: VectorStoreProvider::Sqlite,
            sqlite_path: "~/.docqa/vectors.db".to_string(),
            collection: "multi_txt_docs".to_string(),
        }
    }
}

/// Which text the answerer sends to the model alongside the context.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AnswerInput {
    /// The tone-wrapped prompt produced by the template.
    #[default]
    Rendered,
    /// The caller's original question.
    Question,
}

/// Retrieval and generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagSettings {
    /// LLM model for answer generation.
    pub model: String,
    /// Number of chunks retrieved per question.
    pub top_k: usize,
    /// Template used when a request names none.
    pub default_template: String,
    pub answer_input: AnswerInput,
    pub temperature: f32,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            model: "qwen:4b".to_string(),
            top_k: 3,
            default_template: "professional".to_string(),
            answer_input: AnswerInput::Rendered,
            temperature: 0.7,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// TOML file with additional `[[template]]` entries.
    pub templates_file: Option<String>,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

/// Speech-to-text settings for `listen`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionSettings {
    pub model: String,
    /// Language hint (ISO-639-1), e.g. "zh".
    pub language: Option<String>,
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            model: "whisper-1".to_string(),
            language: None,
        }
    }
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        let settings: Settings = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Settings::default()
        };

        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            return Err(DocqaError::Config("chunking.chunk_size must be greater than 0".to_string()));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(DocqaError::Config(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunking.chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        if self.rag.top_k == 0 {
            return Err(DocqaError::Config("rag.top_k must be greater than 0".to_string()));
        }
        if self.embedding.batch_size == 0 {
            return Err(DocqaError::Config("embedding.batch_size must be greater than 0".to_string()));
        }
        if self.vector_store.collection.trim().is_empty() {
            return Err(DocqaError::Config("vector_store.collection must not be empty".to_string()));
        }
        url::Url::parse(&self.llm.api_base).map_err(|e| {
            DocqaError::Config(format!("llm.api_base '{}' is not a valid URL: {}", self.llm.api_base, e))
        })?;
        Ok(())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| DocqaError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("docqa")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded input directory path.
    pub fn input_dir(&self) -> PathBuf {
        Self::expand_path(&self.ingest.input_dir)
    }

    /// Get the expanded SQLite database path.
    pub fn sqlite_path(&self) -> PathBuf {
        Self::expand_path(&self.vector_store.sqlite_path)
    }

    /// Get the expanded path of the extra templates file, if configured.
    pub fn templates_file(&self) -> Option<PathBuf> {
        self.prompts.templates_file.as_deref().map(Self::expand_path)
    }
}
