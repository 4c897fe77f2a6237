//! Configuration module for docqa.
//!
//! Handles loading and managing application settings and prompt text.

mod prompts;
mod settings;

pub use prompts::{AnswerPrompts, Prompts, TemplateDefinition};
pub use settings::{
    AnswerInput, ChunkingSettings, EmbeddingSettings, GeneralSettings, IngestSettings,
    LlmSettings, PromptSettings, RagSettings, ServerSettings, Settings, TranscriptionSettings,
    VectorStoreProvider, VectorStoreSettings,
};
