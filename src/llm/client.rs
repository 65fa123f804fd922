use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use super::presets::EndpointConfig;
use crate::error::{truncate_chars, LlmError};
use crate::utils::json_text::parse_model_json;

const UPSTREAM_BODY_LIMIT: usize = 600;

/// Which pipeline stage a request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Collector,
    Reviewer,
    FastFill,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Collector => "collector",
            Stage::Reviewer => "reviewer",
            Stage::FastFill => "fast_fill",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub stage: Stage,
    pub endpoint: EndpointConfig,
    pub messages: Vec<ChatMessage>,
    /// Overrides the endpoint's own `force_json` flag when set.
    pub force_json: Option<bool>,
}

impl ChatRequest {
    pub fn new(stage: Stage, endpoint: EndpointConfig, messages: Vec<ChatMessage>) -> Self {
        Self {
            stage,
            endpoint,
            messages,
            force_json: None,
        }
    }

    pub fn forcing_json(mut self) -> Self {
        self.force_json = Some(true);
        self
    }

    pub fn effective_force_json(&self) -> bool {
        self.force_json.unwrap_or(self.endpoint.force_json)
    }

    /// Request body for an OpenAI-compatible chat completion.
    pub fn payload(&self) -> Value {
        let mut payload = json!({
            "model": self.endpoint.model,
            "messages": self.messages,
            "stream": false,
        });
        if self.endpoint.supports_response_format && self.effective_force_json() {
            payload["response_format"] = json!({"type": "json_object"});
        }
        payload
    }
}

/// Abstracts the JSON-producing generation call so it can be stubbed in tests.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Send one chat completion and parse the reply content as JSON.
    async fn complete_json(&self, request: ChatRequest) -> Result<Value, LlmError>;
}

/// [`ChatClient`] over an OpenAI-compatible HTTP endpoint.
#[derive(Debug, Clone, Default)]
pub struct HttpChatClient {
    client: Client,
}

impl HttpChatClient {
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ChatClient for HttpChatClient {
    async fn complete_json(&self, request: ChatRequest) -> Result<Value, LlmError> {
        let endpoint = &request.endpoint;
        endpoint.ensure_complete()?;

        let url = endpoint.url();
        let payload = request.payload();
        info!(
            stage = request.stage.as_str(),
            url = %url,
            model = %endpoint.model,
            force_json = request.effective_force_json(),
            "LLM request"
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&endpoint.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    LlmError::Timeout {
                        url: url.clone(),
                        timeout_secs: endpoint.timeout.as_secs(),
                    }
                } else {
                    LlmError::Transport {
                        url: url.clone(),
                        message: err.to_string(),
                    }
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|err| LlmError::Transport {
            url: url.clone(),
            message: err.to_string(),
        })?;

        if !status.is_success() {
            return Err(LlmError::Upstream {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_string(),
                url,
                body: truncate_chars(&body, UPSTREAM_BODY_LIMIT),
            });
        }

        let data: Value = serde_json::from_str(&body).map_err(|_| LlmError::malformed(&body))?;
        let content = data
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .ok_or_else(|| LlmError::malformed(&body))?;
        debug!(stage = request.stage.as_str(), chars = content.len(), "LLM reply received");

        parse_model_json(content)
    }
}
