//! Collections command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::vector_store::open_store;
use anyhow::Result;

/// Run the collections command.
pub async fn run_collections(settings: &Settings) -> Result<()> {
    let store = open_store(settings)?;

    match store.list_collections().await {
        Ok(collections) => {
            if collections.is_empty() {
                Output::info("Nothing indexed yet. Use 'docqa index' to add documents.");
            } else {
                Output::header(&format!("Collections ({})", collections.len()));
                println!();

                for info in &collections {
                    Output::collection_info(
                        &info.name,
                        info.entry_count,
                        &info.embedding_model,
                        info.dimensions,
                    );
                }

                let total: usize = collections.iter().map(|c| c.entry_count).sum();
                println!();
                Output::kv("Configured", &settings.vector_store.collection);
                Output::kv("Total chunks", &total.to_string());
            }
        }
        Err(e) => {
            Output::error(&format!("Failed to list collections: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
