//! Doctor command - verify configuration, inputs, and the model endpoint.

use crate::cli::Output;
use crate::config::Settings;
use crate::ingest::load_documents;
use console::style;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

const PROBE_TIMEOUT_SECS: u64 = 5;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub async fn run_doctor(settings: &Settings, config_path: Option<PathBuf>) -> anyhow::Result<()> {
    Output::header("docqa doctor");
    println!();

    let mut checks = Vec::new();

    print_section("Configuration", &mut checks, vec![
        check_config_file(config_path),
        check_settings(settings),
    ]);
    print_section("Directories", &mut checks, check_directories(settings));
    print_section("Model endpoint", &mut checks, check_endpoint(settings).await);

    // Summary
    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!("{} error(s) found. Please fix them before using docqa.", errors));
        anyhow::bail!("{} doctor check(s) failed", errors);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! docqa is ready to use.");
    }

    Ok(())
}

fn print_section(title: &str, checks: &mut Vec<CheckResult>, results: Vec<CheckResult>) {
    println!("{}", style(title).bold());
    for check in &results {
        check.print();
    }
    println!();
    checks.extend(results);
}

fn check_config_file(config_path: Option<PathBuf>) -> CheckResult {
    let config_path = config_path.unwrap_or_else(Settings::default_config_path);
    if config_path.exists() {
        CheckResult::ok("Config file", &format!("{}", config_path.display()))
    } else {
        CheckResult::warning("Config file", "using defaults", "Create with: docqa config edit")
    }
}

fn check_settings(settings: &Settings) -> CheckResult {
    match settings.validate() {
        Ok(()) => CheckResult::ok(
            "Settings",
            &format!(
                "chunks {}/{} overlap, top {} results, template '{}'",
                settings.chunking.chunk_size,
                settings.chunking.chunk_overlap,
                settings.rag.top_k,
                settings.rag.default_template
            ),
        ),
        Err(e) => CheckResult::error("Settings", &e.to_string(), "Fix with: docqa config edit"),
    }
}

fn check_directories(settings: &Settings) -> Vec<CheckResult> {
    let mut results = Vec::new();

    let input_dir = settings.input_dir();
    match load_documents(&input_dir, &settings.ingest.extension) {
        Ok(docs) if docs.is_empty() => results.push(CheckResult::warning(
            "Input directory",
            &format!("{} (no .{} files)", input_dir.display(), settings.ingest.extension),
            "Add documents before running: docqa index",
        )),
        Ok(docs) => results.push(CheckResult::ok(
            "Input directory",
            &format!("{} ({} documents)", input_dir.display(), docs.len()),
        )),
        Err(e) => results.push(CheckResult::error(
            "Input directory",
            &e.to_string(),
            "Set ingest.input_dir or pass --input to docqa index",
        )),
    }

    let db_path = settings.sqlite_path();
    if db_path.exists() {
        let size = std::fs::metadata(&db_path)
            .map(|m| format_size(m.len()))
            .unwrap_or_else(|_| "unknown size".to_string());
        results.push(CheckResult::ok("Database", &format!("{} ({})", db_path.display(), size)));
    } else {
        results.push(CheckResult::warning(
            "Database",
            &format!("{} (not created yet)", db_path.display()),
            "Database will be created on first index",
        ));
    }

    results
}

#[derive(Debug, Deserialize)]
struct ModelList {
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

async fn check_endpoint(settings: &Settings) -> Vec<CheckResult> {
    let base = settings.llm.api_base.trim_end_matches('/');
    let url = format!("{}/models", base);

    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(PROBE_TIMEOUT_SECS))
        .build()
    {
        Ok(client) => client,
        Err(e) => return vec![CheckResult::error("Endpoint", &e.to_string(), "Check llm.api_base")],
    };

    let mut request = client.get(&url);
    if let Ok(key) = std::env::var("OPENAI_API_KEY") {
        if !key.is_empty() {
            request = request.bearer_auth(key);
        }
    }

    let models = match request.send().await {
        Ok(resp) if resp.status().is_success() => match resp.json::<ModelList>().await {
            Ok(list) => list.data.into_iter().map(|m| m.id).collect::<Vec<_>>(),
            Err(e) => {
                return vec![CheckResult::warning(
                    "Endpoint",
                    &format!("{} answered with an unexpected model list: {}", base, e),
                    "The endpoint should be OpenAI-compatible",
                )]
            }
        },
        Ok(resp) => {
            return vec![CheckResult::error(
                "Endpoint",
                &format!("{} returned {}", url, resp.status()),
                "Check llm.api_base and OPENAI_API_KEY",
            )]
        }
        Err(e) => {
            return vec![CheckResult::error(
                "Endpoint",
                &format!("{} unreachable: {}", base, e),
                "Start the model server (e.g. 'ollama serve') or fix llm.api_base",
            )]
        }
    };

    let mut results = vec![CheckResult::ok("Endpoint", &format!("{} ({} models)", base, models.len()))];
    for (role, model) in [
        ("Embedding model", &settings.embedding.model),
        ("Language model", &settings.rag.model),
    ] {
        if model_listed(&models, model) {
            results.push(CheckResult::ok(role, model));
        } else {
            results.push(CheckResult::warning(
                role,
                &format!("{} not listed by the endpoint", model),
                &format!("Pull it first, e.g.: ollama pull {}", model),
            ));
        }
    }
    results
}

/// Whether `model` is among `available`, allowing Ollama's implicit `:latest` tag.
fn model_listed(available: &[String], model: &str) -> bool {
    available.iter().any(|id| {
        id == model || (!model.contains(':') && id.strip_suffix(":latest") == Some(model))
    })
}

/// Format file size in human-readable format.
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_check_result_error() {
        let result = CheckResult::error("test", "failed", "fix it");
        assert_eq!(result.status, CheckStatus::Error);
        assert_eq!(result.hint, Some("fix it".to_string()));
    }

    #[test]
    fn test_model_listed() {
        let available = vec!["mistral:latest".to_string(), "qwen:4b".to_string()];
        assert!(model_listed(&available, "mistral"));
        assert!(model_listed(&available, "qwen:4b"));
        assert!(!model_listed(&available, "qwen"));
        assert!(!model_listed(&available, "llama3"));
    }

    #[test]
    fn test_check_directories() {
        let dir = TempDir::new().unwrap();
        let mut settings = Settings::default();
        settings.ingest.input_dir = dir.path().to_string_lossy().to_string();
        settings.vector_store.sqlite_path = dir.path().join("vectors.db").to_string_lossy().to_string();

        let results = check_directories(&settings);
        assert_eq!(results[0].status, CheckStatus::Warning);
        assert_eq!(results[1].status, CheckStatus::Warning);

        std::fs::write(dir.path().join("a.txt"), "hello").unwrap();
        let results = check_directories(&settings);
        assert_eq!(results[0].status, CheckStatus::Ok);
    }

    #[test]
    fn test_check_settings_reports_invalid() {
        let mut settings = Settings::default();
        settings.rag.top_k = 0;
        assert_eq!(check_settings(&settings).status, CheckStatus::Error);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_error() {
        let mut settings = Settings::default();
        settings.llm.api_base = "http://127.0.0.1:1/v1".to_string();
        let results = check_endpoint(&settings).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].status, CheckStatus::Error);
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(500), "500 B");
        assert_eq!(format_size(1024), "1.0 KB");
        assert_eq!(format_size(1024 * 1024), "1.0 MB");
    }
}
