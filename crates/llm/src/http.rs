//! OpenAI-compatible HTTP backend (chat completions + embeddings), grounded
//! in the teacher's `OllamaClient`/`OpenRouterClient` shape: a thin
//! `reqwest::Client` wrapper with no state retained between calls.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::backend::Backend;
use crate::cancel::CancelToken;
use crate::error::GatewayError;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    chat_url: String,
    embed_url: String,
    api_key: Option<String>,
}

impl HttpBackend {
    pub fn new(chat_url: impl Into<String>, embed_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder().timeout(DEFAULT_TIMEOUT).build().unwrap_or_default(),
            chat_url: chat_url.into(),
            embed_url: embed_url.into(),
            api_key: None,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    fn classify_status(status: reqwest::StatusCode, body: &str) -> GatewayError {
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            GatewayError::Quota(body.to_string())
        } else if status.is_client_error() {
            GatewayError::Invalid(format!("{status}: {body}"))
        } else {
            GatewayError::Transient(format!("{status}: {body}"))
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f64,
    messages: [ChatMessage<'a>; 1],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    embedding: Vec<f32>,
}

#[async_trait]
impl Backend for HttpBackend {
    async fn chat(
        &self,
        prompt: &str,
        temperature: f64,
        model_tag: &str,
        cancel: &CancelToken,
    ) -> Result<String, GatewayError> {
        if cancel.is_cancelled() {
            return Err(GatewayError::Cancelled);
        }
        let body = ChatRequest {
            model: model_tag,
            temperature,
            messages: [ChatMessage { role: "user", content: prompt }],
        };

        let mut request = self.client.post(&self.chat_url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = tokio::select! {
            result = request.send() => result.map_err(|err| GatewayError::Transient(err.to_string()))?,
            _ = cancel.cancelled() => return Err(GatewayError::Cancelled),
        };

        let status = response.status();
        let text = response.text().await.map_err(|err| GatewayError::Transient(err.to_string()))?;
        if !status.is_success() {
            return Err(Self::classify_status(status, &text));
        }

        let parsed: ChatCompletion =
            serde_json::from_str(&text).map_err(|err| GatewayError::Invalid(err.to_string()))?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| GatewayError::Invalid("empty choices in chat completion".to_string()))
    }

    async fn embed(
        &self,
        texts: &[String],
        model_tag: &str,
        cancel: &CancelToken,
    ) -> Result<Vec<Vec<f32>>, GatewayError> {
        if cancel.is_cancelled() {
            return Err(GatewayError::Cancelled);
        }
        let body = json!({ "model": model_tag, "input": texts });
        let mut request = self.client.post(&self.embed_url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = tokio::select! {
            result = request.send() => result.map_err(|err| GatewayError::Transient(err.to_string()))?,
            _ = cancel.cancelled() => return Err(GatewayError::Cancelled),
        };

        let status = response.status();
        let text = response.text().await.map_err(|err| GatewayError::Transient(err.to_string()))?;
        if !status.is_success() {
            return Err(Self::classify_status(status, &text));
        }

        let parsed: EmbeddingResponse =
            serde_json::from_str(&text).map_err(|err| GatewayError::Invalid(err.to_string()))?;
        Ok(parsed.data.into_iter().map(|item| item.embedding).collect())
    }
}
