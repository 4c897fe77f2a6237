//! Prompt text for docqa.
//!
//! The answer prompt can be overridden, and extra tone templates added, through
//! a TOML file configured as `prompts.templates_file`:
//!
//! ```toml
//! [answer]
//! system = "..."
//! user = "{{context}} ... {{question}}"
//!
//! [[template]]
//! name = "pirate"
//! fields = ["raw_question"]
//! format = "Answer like a pirate: {raw_question}"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Prompt configuration loaded at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub answer: AnswerPrompts,
    /// Additional templates to register next to the built-in tones.
    #[serde(rename = "template")]
    pub templates: Vec<TemplateDefinition>,
}

/// A user-supplied template definition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TemplateDefinition {
    pub name: String,
    pub fields: Vec<String>,
    pub format: String,
}

/// Prompts for answer generation over retrieved context.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnswerPrompts {
    pub system: String,
    pub user: String,
}

impl Default for AnswerPrompts {
    fn default() -> Self {
        Self {
            system: "Use the following pieces of context to answer the question at the end. \
                     If you don't know the answer, just say that you don't know, don't try to \
                     make up an answer."
                .to_string(),

            user: r#"{{context}}

Question: {{question}}
Helpful Answer:"#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts, applying the optional overrides file.
    pub fn load(templates_file: Option<&Path>) -> crate::error::Result<Self> {
        match templates_file {
            Some(path) if path.exists() => {
                let content = std::fs::read_to_string(path)?;
                Ok(toml::from_str(&content)?)
            }
            Some(path) => Err(crate::error::DocqaError::Config(format!(
                "Templates file not found: {}",
                path.display()
            ))),
            None => Ok(Prompts::default()),
        }
    }

    /// Render a `{{variable}}` prompt with the given variables.
    ///
    /// Substitution is a single left-to-right pass: inserted values are never
    /// scanned for placeholders. Unknown placeholders are left as written.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(open) = rest.find("{{") {
            result.push_str(&rest[..open]);
            let after = &rest[open + 2..];
            let value = after
                .find("}}")
                .and_then(|close| vars.get(&after[..close]).map(|value| (close, value)));
            match value {
                Some((close, value)) => {
                    result.push_str(value);
                    rest = &after[close + 2..];
                }
                None => {
                    result.push_str("{{");
                    rest = after;
                }
            }
        }

        result.push_str(rest);
        result
    }
}
