//! Chat-completion client for a local Ollama runtime.
//!
//! This crate provides the Rust side of the conversation with the language
//! model. It handles:
//! - Building the non-streaming `/api/chat` request (model, messages, temperature)
//! - Extracting the assistant text from the response
//! - Listing installed models for health checks
//! - Warming the model up so the first real turn is not slow
//!
//! Callers depend on the `ChatService` trait, never on `OllamaClient`
//! directly, so the orchestrator can be driven by a scripted fake in tests.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Default Ollama endpoint
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Default model tag
pub const DEFAULT_MODEL: &str = "qwen3:4b";

/// Default timeout for one chat completion
pub const DEFAULT_CHAT_TIMEOUT: Duration = Duration::from_secs(60);

const HEALTH_TIMEOUT: Duration = Duration::from_secs(3);
const WARM_UP_TIMEOUT: Duration = Duration::from_secs(10);

// ===== Errors =====

/// Errors that can occur when talking to the chat service
#[derive(Error, Debug)]
pub enum LlmClientError {
    #[error("Failed to reach chat service: {0}")]
    Connection(String),

    #[error("Chat service returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Invalid response from chat service: {0}")]
    InvalidResponse(String),
}

impl LlmClientError {
    fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_decode() {
            LlmClientError::InvalidResponse(err.to_string())
        } else {
            LlmClientError::Connection(err.to_string())
        }
    }
}

/// Convenience type alias for chat client results
pub type Result<T> = std::result::Result<T, LlmClientError>;

// ===== Messages =====

/// Who authored a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One message of a chat exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Anything that turns an ordered message list into assistant text.
#[async_trait]
pub trait ChatService: Send + Sync {
    async fn chat(&self, messages: &[ChatMessage], temperature: f32) -> Result<String>;
}

// ===== Wire format =====

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<ChatOptions>,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: String,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Deserialize)]
struct ModelTag {
    name: String,
}

// ===== Client =====

/// HTTP client for the Ollama chat API.
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaClient {
    /// Build a client for `base_url` using `model` for every completion.
    ///
    /// `timeout` bounds each chat call; health checks and warm-up use their
    /// own shorter limits.
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmClientError::Connection(e.to_string()))?;

        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self {
            client,
            base_url,
            model: model.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn post_chat(&self, request: &ChatRequest<'_>, timeout: Option<Duration>) -> Result<String> {
        let url = format!("{}/api/chat", self.base_url);

        let mut builder = self.client.post(&url).json(request);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(|e| {
            error!("Chat request to {} failed: {}", url, e);
            LlmClientError::from_reqwest(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmClientError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmClientError::InvalidResponse(e.to_string()))?;

        Ok(parsed.message.content)
    }

    /// Names of the models installed on the runtime.
    pub async fn health(&self) -> Result<Vec<String>> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self
            .client
            .get(&url)
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await
            .map_err(LlmClientError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            return Err(LlmClientError::Api {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| LlmClientError::InvalidResponse(e.to_string()))?;

        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    /// Send a throwaway greeting so the model is loaded before the first turn.
    ///
    /// Failures are logged and reported but never fatal to the caller.
    pub async fn warm_up(&self) -> Result<()> {
        let messages = [ChatMessage::user("Bonjour")];
        let request = ChatRequest {
            model: &self.model,
            messages: &messages,
            stream: false,
            options: None,
        };

        match self.post_chat(&request, Some(WARM_UP_TIMEOUT)).await {
            Ok(_) => {
                info!("Model {} warmed up", self.model);
                Ok(())
            }
            Err(e) => {
                warn!("Warm-up of {} failed: {}", self.model, e);
                Err(e)
            }
        }
    }
}

#[async_trait]
impl ChatService for OllamaClient {
    async fn chat(&self, messages: &[ChatMessage], temperature: f32) -> Result<String> {
        debug!(
            "Chat completion with {} messages (model {}, temperature {})",
            messages.len(),
            self.model,
            temperature
        );

        let request = ChatRequest {
            model: &self.model,
            messages,
            stream: false,
            options: Some(ChatOptions { temperature }),
        };

        self.post_chat(&request, None).await
    }
}
