//! Client construction for OpenAI-compatible endpoints (Ollama, OpenAI).

use crate::config::LlmSettings;
use crate::error::{DocqaError, Result};
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Default timeout for model requests (5 minutes).
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Ollama ignores the key, but async-openai always sends a bearer header.
const PLACEHOLDER_API_KEY: &str = "ollama";

/// Create a client for the configured endpoint.
///
/// The API key is taken from `OPENAI_API_KEY` when set.
pub fn create_client(llm: &LlmSettings) -> Result<Client<OpenAIConfig>> {
    create_client_with_timeout(llm, Duration::from_secs(llm.timeout_seconds))
}

/// Create a client with an explicit timeout.
pub fn create_client_with_timeout(
    llm: &LlmSettings,
    timeout: Duration,
) -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| DocqaError::Config(format!("Failed to create HTTP client: {}", e)))?;

    let api_key = std::env::var("OPENAI_API_KEY")
        .ok()
        .filter(|k| !k.is_empty())
        .unwrap_or_else(|| PLACEHOLDER_API_KEY.to_string());

    let config = OpenAIConfig::new()
        .with_api_base(llm.api_base.trim_end_matches('/'))
        .with_api_key(api_key);

    Ok(Client::with_config(config).with_http_client(http_client))
}
