//! Search command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the search command.
pub async fn run_search(query: &str, limit: usize, settings: Settings) -> Result<()> {
    preflight::check(Operation::Query, &settings)?;
    let orchestrator = Orchestrator::new(settings)?;

    let spinner = Output::spinner("Searching...");
    let results = orchestrator.search(query, limit).await;
    spinner.finish_and_clear();

    match results {
        Ok(chunks) => {
            if chunks.is_empty() {
                Output::warning("No results found. Use 'docqa index' to add documents.");
            } else {
                Output::success(&format!("Found {} results", chunks.len()));

                for chunk in &chunks {
                    Output::search_result(&chunk.source, chunk.chunk_index, chunk.score, &chunk.content);
                }
            }
        }
        Err(e) => {
            Output::error(&format!("Search failed: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
