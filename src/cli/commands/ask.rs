//! Ask command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::{Orchestrator, QueryRequest};
use anyhow::Result;

/// Run the ask command.
pub async fn run_ask(
    question: &str,
    template: Option<String>,
    sources: bool,
    settings: Settings,
) -> Result<()> {
    // Pre-flight checks
    if let Err(e) = preflight::check(Operation::Query, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'docqa doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;
    let request = QueryRequest {
        question: Some(question.to_string()),
        template_name: template,
    };

    let spinner = Output::spinner("Searching knowledge base...");
    let result = orchestrator.try_query(&request).await;
    spinner.finish_and_clear();

    let result = match result {
        Ok(result) => result,
        Err(e) => {
            Output::error(&format!("Failed to generate answer: {}", e));
            return Err(e.into());
        }
    };

    println!("\n{}\n", result.answer);

    if sources && !result.sources.is_empty() {
        Output::header("Sources");
        for chunk in &result.sources {
            Output::search_result(&chunk.source, chunk.chunk_index, chunk.score, &chunk.content);
        }
    }

    Ok(())
}
