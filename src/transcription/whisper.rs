//! Whisper transcription over an OpenAI-compatible audio endpoint.

use super::Transcriber;
use crate::config::{LlmSettings, TranscriptionSettings};
use crate::error::{DocqaError, Result};
use crate::openai::create_client;
use async_openai::types::{AudioInput, AudioResponseFormat, CreateTranscriptionRequestArgs};
use async_trait::async_trait;
use std::path::Path;
use tracing::{debug, instrument};

/// Whisper-based transcriber.
pub struct WhisperTranscriber {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    language: Option<String>,
}

impl WhisperTranscriber {
    pub fn new(llm: &LlmSettings, settings: &TranscriptionSettings) -> Result<Self> {
        Ok(Self {
            client: create_client(llm)?,
            model: settings.model.clone(),
            language: settings.language.clone(),
        })
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    #[instrument(skip(self), fields(audio_path = %audio_path.display(), model = %self.model))]
    async fn transcribe(&self, audio_path: &Path) -> Result<String> {
        let file_bytes = tokio::fs::read(audio_path).await?;
        let file_name = audio_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.wav")
            .to_string();

        let mut request_builder = CreateTranscriptionRequestArgs::default();
        request_builder
            .file(AudioInput::from_vec_u8(file_name, file_bytes))
            .model(&self.model)
            .response_format(AudioResponseFormat::Json);

        if let Some(lang) = &self.language {
            request_builder.language(lang);
        }

        let request = request_builder
            .build()
            .map_err(|e| DocqaError::Transcription(format!("Failed to build request: {}", e)))?;

        let response = self
            .client
            .audio()
            .transcribe(request)
            .await
            .map_err(|e| DocqaError::Transcription(format!("Whisper API error: {}", e)))?;

        let text = response.text.trim().to_string();
        debug!("Transcribed {} characters", text.len());
        Ok(text)
    }
}
