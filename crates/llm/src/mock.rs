//! Deterministic stub backend used by the engine's own test suite (the
//! "LLM stubbed" scenarios S1–S6 in `spec.md` §8) and available to
//! downstream crates under the same `mock`-style carve-out the teacher uses
//! for in-process testing without a network call.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::backend::Backend;
use crate::cancel::CancelToken;
use crate::error::GatewayError;

/// A scripted backend: `chat` pops the next queued result (or falls back to
/// echoing the prompt once the queue is empty); `embed` is a deterministic
/// hash-based projection so identical text always yields the identical unit
/// vector, satisfying the semantic-cache round-trip property in `spec.md`
/// §8 without a real embedding model.
pub struct MockBackend {
    embedding_dim: usize,
    scripted_chat: Mutex<VecDeque<Result<String, GatewayError>>>,
    chat_calls: AtomicUsize,
    embed_calls: AtomicUsize,
}

impl MockBackend {
    pub fn new(embedding_dim: usize) -> Self {
        Self {
            embedding_dim,
            scripted_chat: Mutex::new(VecDeque::new()),
            chat_calls: AtomicUsize::new(0),
            embed_calls: AtomicUsize::new(0),
        }
    }

    /// Queue a response (or error) to be returned by the next `chat` call.
    /// Responses are served FIFO; once exhausted, `chat` falls back to a
    /// deterministic echo of the prompt.
    pub fn push_chat(&self, response: Result<String, GatewayError>) {
        self.scripted_chat.lock().unwrap().push_back(response);
    }

    pub fn chat_call_count(&self) -> usize {
        self.chat_calls.load(Ordering::SeqCst)
    }

    pub fn embed_call_count(&self) -> usize {
        self.embed_calls.load(Ordering::SeqCst)
    }

    fn deterministic_embedding(&self, text: &str) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.embedding_dim);
        let mut counter: u32 = 0;
        while out.len() < self.embedding_dim {
            let mut hasher = Sha256::new();
            hasher.update(text.as_bytes());
            hasher.update(counter.to_le_bytes());
            let digest = hasher.finalize();
            for chunk in digest.chunks_exact(4) {
                if out.len() == self.embedding_dim {
                    break;
                }
                let bytes: [u8; 4] = chunk.try_into().unwrap();
                let raw = u32::from_le_bytes(bytes) as f32 / u32::MAX as f32;
                out.push(raw * 2.0 - 1.0);
            }
            counter += 1;
        }
        let norm = out.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for v in &mut out {
                *v /= norm;
            }
        }
        out
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn chat(
        &self,
        prompt: &str,
        _temperature: f64,
        _model_tag: &str,
        cancel: &CancelToken,
    ) -> Result<String, GatewayError> {
        if cancel.is_cancelled() {
            return Err(GatewayError::Cancelled);
        }
        self.chat_calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self.scripted_chat.lock().unwrap().pop_front();
        match scripted {
            Some(result) => result,
            None => Ok(format!("[mock-reply] {prompt}")),
        }
    }

    async fn embed(
        &self,
        texts: &[String],
        _model_tag: &str,
        cancel: &CancelToken,
    ) -> Result<Vec<Vec<f32>>, GatewayError> {
        if cancel.is_cancelled() {
            return Err(GatewayError::Cancelled);
        }
        self.embed_calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|text| self.deterministic_embedding(text)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn identical_text_yields_identical_embedding() {
        let backend = MockBackend::new(16);
        let cancel = CancelToken::new();
        let a = backend.embed(&["hello world".to_string()], "mock", &cancel).await.unwrap();
        let b = backend.embed(&["hello world".to_string()], "mock", &cancel).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn different_text_yields_different_embedding() {
        let backend = MockBackend::new(16);
        let cancel = CancelToken::new();
        let a = backend.embed(&["hello".to_string()], "mock", &cancel).await.unwrap();
        let b = backend.embed(&["goodbye".to_string()], "mock", &cancel).await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn embedding_is_unit_norm() {
        let backend = MockBackend::new(32);
        let cancel = CancelToken::new();
        let v = &backend.embed(&["anything".to_string()], "mock", &cancel).await.unwrap()[0];
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[tokio::test]
    async fn scripted_responses_served_fifo_then_echo() {
        let backend = MockBackend::new(4);
        let cancel = CancelToken::new();
        backend.push_chat(Ok("first".to_string()));
        backend.push_chat(Err(GatewayError::Transient("boom".to_string())));
        assert_eq!(backend.chat("p", 0.5, "mock", &cancel).await.unwrap(), "first");
        assert!(backend.chat("p", 0.5, "mock", &cancel).await.is_err());
        assert_eq!(backend.chat("p", 0.5, "mock", &cancel).await.unwrap(), "[mock-reply] p");
    }
}
