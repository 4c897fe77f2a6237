//! Built-in tone templates.

use super::PromptTemplate;
use crate::error::Result;

/// Field every built-in template takes: the caller's question.
pub const QUESTION_FIELD: &str = "raw_question";

/// Template applied when a request names none.
pub const DEFAULT_TEMPLATE: &str = "professional";

const BUILTINS: &[(&str, &str)] = &[
    (
        "professional",
        "Answer the following question as a bulleted list: {raw_question}. \
         Keep the answer under 100 words.",
    ),
    (
        "friendly",
        "Reply to this question in a relaxed, friendly way: {raw_question}",
    ),
    (
        "short_answer",
        "Answer the following question in a single sentence: {raw_question}",
    ),
];

/// Parse the built-in templates.
pub fn builtin_templates() -> Result<Vec<PromptTemplate>> {
    let fields = [QUESTION_FIELD.to_string()];
    BUILTINS
        .iter()
        .map(|(name, format)| PromptTemplate::parse(name, &fields, format))
        .collect()
}
