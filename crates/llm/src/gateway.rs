use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, instrument, warn};

use crate::backend::Backend;
use crate::cancel::CancelToken;
use crate::error::GatewayError;

/// Retry budget for transient failures: at most 3 attempts total, bounded
/// exponential backoff starting at 100ms (`spec.md` §4.1).
const MAX_ATTEMPTS: u32 = 3;
const BASE_BACKOFF: Duration = Duration::from_millis(100);

/// Uniform call interface to a chat model and an embedding model (C1).
/// Wraps a [`Backend`] with retry-on-transient-failure and prompt
/// cancellation; never retains request state between calls.
#[derive(Clone)]
pub struct Gateway {
    backend: Arc<dyn Backend>,
}

impl Gateway {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    #[instrument(skip(self, prompt, cancel), fields(model_tag, attempts))]
    pub async fn chat(
        &self,
        prompt: &str,
        temperature: f64,
        model_tag: &str,
        cancel: &CancelToken,
    ) -> Result<String, GatewayError> {
        Self::with_retry(cancel, |attempt| {
            tracing::Span::current().record("attempts", attempt);
            self.backend.chat(prompt, temperature, model_tag, cancel)
        })
        .await
    }

    #[instrument(skip(self, texts, cancel), fields(model_tag, count = texts.len()))]
    pub async fn embed(
        &self,
        texts: &[String],
        model_tag: &str,
        cancel: &CancelToken,
    ) -> Result<Vec<Vec<f32>>, GatewayError> {
        Self::with_retry(cancel, |_attempt| self.backend.embed(texts, model_tag, cancel)).await
    }

    async fn with_retry<T, Fut>(
        cancel: &CancelToken,
        mut call: impl FnMut(u32) -> Fut,
    ) -> Result<T, GatewayError>
    where
        Fut: std::future::Future<Output = Result<T, GatewayError>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            if cancel.is_cancelled() {
                return Err(GatewayError::Cancelled);
            }

            let outcome = tokio::select! {
                result = call(attempt) => result,
                _ = cancel.cancelled() => Err(GatewayError::Cancelled),
            };

            match outcome {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < MAX_ATTEMPTS => {
                    let backoff = BASE_BACKOFF * 2u32.pow(attempt - 1);
                    warn!(attempt, ?backoff, error = %err, "transient LLM error, retrying");
                    tokio::select! {
                        _ = tokio::time::sleep(backoff) => {}
                        _ = cancel.cancelled() => return Err(GatewayError::Cancelled),
                    }
                }
                Err(err) => {
                    debug!(attempt, error = %err, "gateway call failed, not retrying");
                    return Err(err);
                }
            }
        }
    }
}
