//! Templates command implementation.

use crate::cli::Output;
use crate::config::{Prompts, Settings};
use crate::template::TemplateRegistry;
use anyhow::Result;

/// Run the templates command.
pub fn run_templates(settings: &Settings) -> Result<()> {
    let prompts = Prompts::load(settings.templates_file().as_deref())?;
    let registry = TemplateRegistry::from_prompts(&prompts)?;

    Output::header(&format!("Templates ({})", registry.len()));
    for template in registry.list() {
        let marker = if template.name() == settings.rag.default_template {
            " (default)"
        } else {
            ""
        };
        Output::list_item(&format!("{}{}", template.name(), marker));
        Output::kv("fields", &template.required_fields().join(", "));
        Output::kv("format", template.format_string());
    }

    Ok(())
}
