//! Chat completions over an OpenAI-compatible API.

use super::Generator;
use crate::config::{LlmSettings, RagSettings};
use crate::error::{DocqaError, Result};
use crate::openai::create_client;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Generator backed by the `/chat/completions` endpoint.
pub struct OpenAIGenerator {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    temperature: f32,
}

impl OpenAIGenerator {
    pub fn new(llm: &LlmSettings, rag: &RagSettings) -> Result<Self> {
        Ok(Self {
            client: create_client(llm)?,
            model: rag.model.clone(),
            temperature: rag.temperature,
        })
    }
}

#[async_trait]
impl Generator for OpenAIGenerator {
    #[instrument(skip(self, system, user), fields(model = %self.model))]
    async fn generate(&self, system: &str, user: &str) -> Result<String> {
        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system)
                .build()
                .map_err(|e| DocqaError::GenerationFailure(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(user)
                .build()
                .map_err(|e| DocqaError::GenerationFailure(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(self.temperature)
            .build()
            .map_err(|e| DocqaError::GenerationFailure(e.to_string()))?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            DocqaError::GenerationFailure(format!("Failed to generate response: {}", e))
        })?;

        let answer = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| DocqaError::GenerationFailure("Empty response from LLM".to_string()))?;

        debug!("Generated {} characters", answer.len());
        Ok(answer)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
