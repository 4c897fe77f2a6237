//! Index command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::ingest::load_documents;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the index command.
pub async fn run_index(
    reset: bool,
    input: Option<String>,
    collection: Option<String>,
    mut settings: Settings,
) -> Result<()> {
    if let Some(dir) = input {
        settings.ingest.input_dir = dir;
    }
    if let Some(name) = collection {
        settings.vector_store.collection = name;
    }

    if let Err(e) = preflight::check(Operation::Index, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'docqa doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let input_dir = settings.input_dir();
    let documents = load_documents(&input_dir, &settings.ingest.extension)?;
    if documents.is_empty() {
        Output::warning(&format!(
            "No .{} files found in {}",
            settings.ingest.extension,
            input_dir.display()
        ));
        return Ok(());
    }
    Output::info(&format!("Loaded {} documents from {}", documents.len(), input_dir.display()));

    let orchestrator = Orchestrator::new(settings)?;

    let spinner = Output::spinner("Embedding and indexing...");
    let result = orchestrator
        .index_documents(&documents, reset, |written| {
            spinner.set_message(format!("Embedding and indexing... {} chunks", written));
        })
        .await;
    spinner.finish_and_clear();

    match result {
        Ok(result) => {
            Output::success(&format!(
                "Indexed {} chunks from {} documents into '{}'",
                result.chunks_indexed, result.documents, result.collection
            ));
        }
        Err(e) => {
            Output::error(&format!("Indexing failed: {}", e));
            Output::info("Entries written so far are kept; re-run to finish.");
            return Err(e.into());
        }
    }

    Ok(())
}
