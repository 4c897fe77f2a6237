//! Language-model text generation.

mod openai;

pub use openai::OpenAIGenerator;

use crate::error::Result;
use async_trait::async_trait;

/// Trait for chat-style text generation.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate a reply to `user` under the `system` instruction.
    ///
    /// A single attempt; failures surface as `GenerationFailure`.
    async fn generate(&self, system: &str, user: &str) -> Result<String>;

    /// Name of the model answering.
    fn model_name(&self) -> &str;
}
