//! Speech-to-text for spoken questions.
//!
//! A recorded question is transcribed and the transcript is answered through
//! the same query pipeline as typed questions. See [`voice`].

mod whisper;
pub mod voice;

pub use voice::{spawn_voice_question, VoiceEvent, VoiceTask};
pub use whisper::WhisperTranscriber;

use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Trait for transcription services.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe an audio file to plain text.
    async fn transcribe(&self, audio_path: &Path) -> Result<String>;
}
