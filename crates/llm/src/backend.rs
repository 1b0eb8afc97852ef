use async_trait::async_trait;

use crate::cancel::CancelToken;
use crate::error::GatewayError;

/// A chat/embedding backend. Implemented once per real vendor SDK
/// (`HttpBackend`) and once for deterministic testing (`MockBackend`) — the
/// same shape the teacher uses for `OllamaClient`/`OpenRouterClient` behind
/// `LlmRouter`.
///
/// Implementations must not retain state between calls (`spec.md` §4.1):
/// retries and backoff are the caller's ([`crate::Gateway`]'s)
/// responsibility, not the backend's.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn chat(
        &self,
        prompt: &str,
        temperature: f64,
        model_tag: &str,
        cancel: &CancelToken,
    ) -> Result<String, GatewayError>;

    async fn embed(
        &self,
        texts: &[String],
        model_tag: &str,
        cancel: &CancelToken,
    ) -> Result<Vec<Vec<f32>>, GatewayError>;
}
