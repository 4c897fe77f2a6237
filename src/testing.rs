//! Deterministic stand-ins for the model services, used by unit tests.

use crate::embedding::Embedder;
use crate::error::{DocqaError, Result};
use crate::llm::Generator;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

const DIMS: usize = 64;

/// Bag-of-words embedder: texts sharing words get similar vectors.
pub struct HashEmbedder {
    model: String,
    pub calls: AtomicUsize,
    /// Fail every call after this many successful ones.
    fail_after: Option<usize>,
}

impl HashEmbedder {
    pub fn new() -> Self {
        Self::with_model("hash-embed")
    }

    pub fn with_model(model: &str) -> Self {
        Self {
            model: model.to_string(),
            calls: AtomicUsize::new(0),
            fail_after: None,
        }
    }

    pub fn failing_after(calls: usize) -> Self {
        Self {
            fail_after: Some(calls),
            ..Self::new()
        }
    }

    pub fn vector(text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; DIMS];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let word = word.to_lowercase();
            // FNV-1a
            let mut hash: u64 = 0xcbf29ce484222325;
            for b in word.bytes() {
                hash ^= b as u64;
                hash = hash.wrapping_mul(0x100000001b3);
            }
            v[(hash % DIMS as u64) as usize] += 1.0;
        }
        // Keep every vector non-zero so cosine similarity is defined.
        v[DIMS - 1] += 0.01;
        v
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut batch = self.embed_batch(&[text.to_string()]).await?;
        Ok(batch.remove(0))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_after.is_some_and(|limit| n >= limit) {
            return Err(DocqaError::EmbeddingFailure("embedding service unreachable".to_string()));
        }
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Generator that echoes what it was asked, or fails on demand.
pub struct EchoGenerator {
    fail: bool,
    pub last_prompt: Mutex<Option<(String, String)>>,
    pub calls: AtomicUsize,
}

impl EchoGenerator {
    pub fn new() -> Self {
        Self {
            fail: false,
            last_prompt: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn last_user_prompt(&self) -> Option<String> {
        self.last_prompt
            .lock()
            .unwrap()
            .as_ref()
            .map(|(_, user)| user.clone())
    }
}

#[async_trait]
impl Generator for EchoGenerator {
    async fn generate(&self, system: &str, user: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().unwrap() = Some((system.to_string(), user.to_string()));
        if self.fail {
            return Err(DocqaError::GenerationFailure("model timed out".to_string()));
        }
        Ok(format!("Answer based on {} characters of prompt", user.chars().count()))
    }

    fn model_name(&self) -> &str {
        "echo"
    }
}
