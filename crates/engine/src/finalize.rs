//! Finalizer (C9): one LLM call over the winning path, no caching
//! (`spec.md` §4.9).

use tot_config::{RunConfig, Task};
use tot_llm::{CancelToken, Gateway};
use tot_prompt::PromptTemplates;

use crate::error::EngineError;

pub struct Finalizer {
    gateway: Gateway,
    templates: PromptTemplates,
    chat_model_tag: String,
}

impl Finalizer {
    pub fn new(gateway: Gateway, templates: PromptTemplates, chat_model_tag: impl Into<String>) -> Self {
        Self { gateway, templates, chat_model_tag: chat_model_tag.into() }
    }

    /// Synthesize the final answer from the winning path. Any Gateway
    /// failure (exhausted retries, cancellation) is mapped to
    /// [`EngineError::Finalize`], which the engine turns into
    /// `stop_reason = finalize_error` / `status = failed`.
    pub async fn finalize(
        &self,
        task: &Task,
        path: &[String],
        config: &RunConfig,
        cancel: &CancelToken,
    ) -> Result<String, EngineError> {
        let prompt = self.templates.render_finalize(task, path);
        self.gateway
            .chat(&prompt, config.finalize_temp, &self.chat_model_tag, cancel)
            .await
            .map_err(|err| EngineError::Finalize(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tot_llm::{GatewayError, MockBackend};

    fn harness(dim: usize) -> (Finalizer, Arc<MockBackend>) {
        let backend = Arc::new(MockBackend::new(dim));
        let gateway = Gateway::new(backend.clone());
        let finalizer = Finalizer::new(gateway, PromptTemplates::default(), "mock-chat");
        (finalizer, backend)
    }

    #[tokio::test]
    async fn successful_call_returns_final_text() {
        let (finalizer, backend) = harness(8);
        backend.push_chat(Ok("the answer is 24".into()));
        let task = Task::new("make 24");
        let config = RunConfig::default();
        let cancel = CancelToken::new();

        let answer = finalizer.finalize(&task, &["root".to_string()], &config, &cancel).await.unwrap();

        assert_eq!(answer, "the answer is 24");
    }

    #[tokio::test]
    async fn exhausted_llm_error_surfaces_as_finalize_error() {
        let (finalizer, backend) = harness(8);
        for _ in 0..5 {
            backend.push_chat(Err(GatewayError::Transient("down".into())));
        }
        let task = Task::new("make 24");
        let config = RunConfig::default();
        let cancel = CancelToken::new();

        let result = finalizer.finalize(&task, &["root".to_string()], &config, &cancel).await;

        assert!(matches!(result, Err(EngineError::Finalize(_))));
    }
}
