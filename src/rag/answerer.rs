//! Answer generation from retrieved context.

use super::{format_context, ContextChunk};
use crate::config::{AnswerPrompts, Prompts};
use crate::error::Result;
use crate::llm::Generator;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Asks the language model a question over a block of retrieved context.
pub struct Answerer {
    generator: Arc<dyn Generator>,
    prompts: AnswerPrompts,
}

impl Answerer {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self {
            generator,
            prompts: AnswerPrompts::default(),
        }
    }

    /// Set custom answer prompts.
    pub fn with_prompts(mut self, prompts: AnswerPrompts) -> Self {
        self.prompts = prompts;
        self
    }

    /// Answer `question` from `context`. The model output is returned verbatim.
    ///
    /// Makes exactly one model call, also when `context` is empty.
    #[instrument(skip(self, question, context), fields(chunks = context.len()))]
    pub async fn answer(&self, question: &str, context: &[ContextChunk]) -> Result<String> {
        let mut vars = HashMap::new();
        vars.insert("context".to_string(), format_context(context));
        vars.insert("question".to_string(), question.to_string());

        let user_prompt = Prompts::render(&self.prompts.user, &vars);
        debug!(
            "Asking {} with {} characters of prompt",
            self.generator.model_name(),
            user_prompt.len()
        );

        self.generator.generate(&self.prompts.system, &user_prompt).await
    }
}
