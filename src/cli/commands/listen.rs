//! Listen command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::{Orchestrator, QueryResponse};
use crate::transcription::{spawn_voice_question, VoiceEvent, WhisperTranscriber};
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;

/// Run the listen command: transcribe a recorded question, then answer it.
pub async fn run_listen(audio: &str, template: Option<String>, settings: Settings) -> Result<()> {
    let audio_path = PathBuf::from(audio);
    if let Err(e) = preflight::check(Operation::Listen(&audio_path), &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let transcriber = Arc::new(WhisperTranscriber::new(&settings.llm, &settings.transcription)?);
    let orchestrator = Arc::new(Orchestrator::new(settings)?);

    let mut task = spawn_voice_question(transcriber, orchestrator, audio_path, template);
    let spinner = Output::spinner("Transcribing...");

    loop {
        // `None` means the user pressed Ctrl-C.
        let event = tokio::select! {
            event = task.next_event() => Some(event),
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(event) = event else {
            task.cancel();
            spinner.finish_and_clear();
            Output::warning("Cancelled.");
            return Ok(());
        };

        match event {
            Some(VoiceEvent::Transcribing) => spinner.set_message("Transcribing..."),
            Some(VoiceEvent::Transcribed(text)) => {
                spinner.suspend(|| Output::kv("Heard", &text));
            }
            Some(VoiceEvent::Answering) => spinner.set_message("Answering..."),
            Some(VoiceEvent::Finished(response)) => {
                spinner.finish_and_clear();
                return match response {
                    QueryResponse::Answer { answer } => {
                        println!("\n{}\n", answer);
                        Ok(())
                    }
                    QueryResponse::Error { error } => {
                        Output::error(&error);
                        Err(anyhow::anyhow!(error))
                    }
                };
            }
            None => {
                spinner.finish_and_clear();
                anyhow::bail!("Voice task ended without an answer");
            }
        }
    }
}
