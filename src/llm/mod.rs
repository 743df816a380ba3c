//! Completion client module for talking to text-completion services.
//!
//! This module provides a trait-based abstraction over completion providers,
//! with OpenRouter as the primary implementation. A request is answered either
//! with a fully materialized string or with a stream of text fragments that the
//! caller accumulates.

mod error;
mod openrouter;
pub mod retry;
#[cfg(test)]
mod scripted;
mod stream;

pub use error::{classify_http_status, LlmError, LlmErrorKind};
pub use openrouter::{OpenRouterClient, OPENROUTER_API_BASE};
pub use retry::RetryPolicy;
#[cfg(test)]
pub use scripted::ScriptedClient;
pub use stream::{collect_stream, SseDecoder, SseEvent};

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};

/// Role in a chat conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A message in a chat conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        ChatMessage {
            role,
            content: content.into(),
        }
    }
}

/// One generation request: a system/user message pair plus sampling limits.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: Option<String>,
    pub user: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Deliver the answer as a stream of fragments.
    pub stream: bool,
    /// Ask the service for a JSON object response, if it supports it.
    pub json_mode: bool,
}

impl CompletionRequest {
    pub fn new(system: Option<String>, user: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            system,
            user: user.into(),
            model: model.into(),
            max_tokens: 4000,
            temperature: 0.7,
            stream: false,
            json_mode: false,
        }
    }

    pub fn with_limits(mut self, max_tokens: u32, temperature: f32) -> Self {
        self.max_tokens = max_tokens;
        self.temperature = temperature;
        self
    }

    pub fn streaming(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    pub fn json_mode(mut self, json_mode: bool) -> Self {
        self.json_mode = json_mode;
        self
    }

    /// The chat messages for this request, system message first when present.
    pub fn messages(&self) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &self.system {
            messages.push(ChatMessage::new(Role::System, system.clone()));
        }
        messages.push(ChatMessage::new(Role::User, self.user.clone()));
        messages
    }
}

/// A finite, non-restartable sequence of text fragments.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send>>;

/// Trait for completion clients.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Name used in log and user-facing messages.
    fn service_name(&self) -> &str;

    /// Send a request and wait for the whole answer.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError>;

    /// Send a request and receive the answer incrementally.
    async fn complete_stream(&self, request: &CompletionRequest) -> Result<TextStream, LlmError>;

    /// Answer `request` as one string, streaming underneath when asked to.
    async fn request_text(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        if request.stream {
            let stream = self.complete_stream(request).await?;
            let text = collect_stream(stream).await?;
            tracing::info!(
                "Completed streaming response from {} API",
                self.service_name()
            );
            Ok(text)
        } else {
            self.complete(request).await
        }
    }
}
