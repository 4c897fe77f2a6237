//! Pre-flight checks before expensive operations.
//!
//! Validates that inputs and configuration are in place before starting
//! operations that would otherwise fail midway.

use crate::config::Settings;
use crate::error::{DocqaError, Result};
use std::path::Path;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation<'a> {
    /// Indexing requires the input directory.
    Index,
    /// Listening requires the recorded audio file.
    Listen(&'a Path),
    /// Asking and searching only require valid settings.
    Query,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation<'_>, settings: &Settings) -> Result<()> {
    settings.validate()?;

    match operation {
        Operation::Index => check_input_dir(&settings.input_dir())?,
        Operation::Listen(audio) => {
            if !audio.is_file() {
                return Err(DocqaError::InvalidInput(format!(
                    "Audio file not found: {}",
                    audio.display()
                )));
            }
        }
        Operation::Query => {}
    }
    Ok(())
}

fn check_input_dir(dir: &Path) -> Result<()> {
    if !dir.is_dir() {
        return Err(DocqaError::InvalidInput(format!(
            "Input directory not found: {}. Set ingest.input_dir or pass --input",
            dir.display()
        )));
    }
    Ok(())
}
