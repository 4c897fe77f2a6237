//! Loading source documents from disk.

use crate::error::{DocqaError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, instrument};

/// A source document. Immutable once loaded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Identifier of the document (its file name).
    pub source: String,
    /// Full text.
    pub text: String,
    /// Encoding the text was decoded from.
    pub encoding: String,
}

impl Document {
    pub fn new(source: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            text: text.into(),
            encoding: "utf-8".to_string(),
        }
    }
}

/// Check whether `path` has the given extension (case-insensitive, no dot).
fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(extension.trim_start_matches('.')))
        .unwrap_or(false)
}

/// Read every file with `extension` directly inside `dir`, sorted by file name.
///
/// Subdirectories are not visited. Files must be valid UTF-8.
#[instrument(skip_all, fields(dir = %dir.display(), extension = %extension))]
pub fn load_documents(dir: &Path, extension: &str) -> Result<Vec<Document>> {
    if !dir.is_dir() {
        return Err(DocqaError::InvalidInput(format!(
            "Input directory not found: {}",
            dir.display()
        )));
    }

    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && has_extension(&path, extension) {
            paths.push(path);
        }
    }
    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    info!("Found {} .{} files", paths.len(), extension);

    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        debug!("Reading {}", path.display());
        let bytes = std::fs::read(&path)?;
        let text = String::from_utf8(bytes).map_err(|_| {
            DocqaError::InvalidInput(format!("{} is not valid UTF-8", path.display()))
        })?;
        let source = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        documents.push(Document::new(source, text));
    }

    Ok(documents)
}
