//! Answering a spoken question as a cancellable background task.

use super::Transcriber;
use crate::orchestrator::{Orchestrator, QueryRequest, QueryResponse};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Progress of a spoken question.
#[derive(Debug, Clone, PartialEq)]
pub enum VoiceEvent {
    Transcribing,
    Transcribed(String),
    Answering,
    /// Always the last event.
    Finished(QueryResponse),
}

/// Handle to a running voice question.
pub struct VoiceTask {
    events: mpsc::Receiver<VoiceEvent>,
    handle: JoinHandle<()>,
}

impl VoiceTask {
    /// Next progress event, or `None` once the task has ended.
    pub async fn next_event(&mut self) -> Option<VoiceEvent> {
        self.events.recv().await
    }

    /// Stop the task. Pending events are dropped.
    pub fn cancel(&self) {
        self.handle.abort();
    }
}

/// Transcribe `audio_path` and answer the transcript in the background.
pub fn spawn_voice_question(
    transcriber: Arc<dyn Transcriber>,
    orchestrator: Arc<Orchestrator>,
    audio_path: PathBuf,
    template_name: Option<String>,
) -> VoiceTask {
    let (tx, rx) = mpsc::channel(8);

    let handle = tokio::spawn(async move {
        if tx.send(VoiceEvent::Transcribing).await.is_err() {
            return;
        }

        let question = match transcriber.transcribe(&audio_path).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Transcription failed: {}", e);
                let _ = tx
                    .send(VoiceEvent::Finished(QueryResponse::Error { error: e.to_string() }))
                    .await;
                return;
            }
        };
        debug!("Transcript: {}", question);

        if tx.send(VoiceEvent::Transcribed(question.clone())).await.is_err() {
            return;
        }
        if tx.send(VoiceEvent::Answering).await.is_err() {
            return;
        }

        let request = QueryRequest {
            question: Some(question),
            template_name,
        };
        let response = orchestrator.query(&request).await;
        let _ = tx.send(VoiceEvent::Finished(response)).await;
    });

    VoiceTask { events: rx, handle }
}
