//! Error types for docqa.

use std::collections::BTreeSet;
use thiserror::Error;

/// Library-level error type for docqa operations.
#[derive(Error, Debug)]
pub enum DocqaError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Template not found: '{0}'")]
    TemplateNotFound(String),

    #[error("Template '{template}' is missing required fields: {}", join_fields(.fields))]
    MissingFields {
        template: String,
        fields: BTreeSet<String>,
    },

    #[error("Template '{template}' received unexpected fields: {}", join_fields(.fields))]
    UnexpectedFields {
        template: String,
        fields: BTreeSet<String>,
    },

    #[error("Invalid template: {0}")]
    InvalidTemplate(String),

    #[error("Missing question: provide a non-empty 'question' field")]
    MissingQuestion,

    #[error("Embedding generation failed: {0}")]
    EmbeddingFailure(String),

    #[error("Generation failed: {0}")]
    GenerationFailure(String),

    #[error(
        "Collection '{collection}' was indexed with embedding model '{indexed}', \
         but '{requested}' is configured"
    )]
    EmbeddingModelMismatch {
        collection: String,
        indexed: String,
        requested: String,
    },

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl DocqaError {
    /// Whether the error was caused by the caller's input rather than infrastructure.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            DocqaError::TemplateNotFound(_)
                | DocqaError::MissingFields { .. }
                | DocqaError::UnexpectedFields { .. }
                | DocqaError::MissingQuestion
                | DocqaError::InvalidInput(_)
        )
    }
}

fn join_fields(fields: &BTreeSet<String>) -> String {
    fields.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}

/// Result type alias for docqa operations.
pub type Result<T> = std::result::Result<T, DocqaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_errors_list_fields_in_order() {
        let err = DocqaError::UnexpectedFields {
            template: "professional".to_string(),
            fields: ["zeta", "alpha"].iter().map(|s| s.to_string()).collect(),
        };
        assert_eq!(
            err.to_string(),
            "Template 'professional' received unexpected fields: alpha, zeta"
        );
        assert!(err.is_caller_error());
    }

    #[test]
    fn test_missing_question_mentions_question() {
        let msg = DocqaError::MissingQuestion.to_string();
        assert!(msg.to_lowercase().contains("question"));
        assert!(!DocqaError::GenerationFailure("timeout".into()).is_caller_error());
    }
}
