//! OpenRouter API client implementation.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::stream::{SseDecoder, SseEvent};
use super::{ChatMessage, CompletionClient, CompletionRequest, LlmError, TextStream};

pub const OPENROUTER_API_BASE: &str = "https://openrouter.ai/api/v1";

/// OpenRouter API client.
///
/// Retries are not handled here; callers wrap requests in a
/// [`RetryPolicy`](super::RetryPolicy).
pub struct OpenRouterClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenRouterClient {
    /// Create a new OpenRouter client against the public endpoint.
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, OPENROUTER_API_BASE.to_string())
    }

    /// Create a client against a custom OpenAI-compatible endpoint.
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn transport_error(e: reqwest::Error) -> LlmError {
        if e.is_timeout() {
            LlmError::timeout(format!("Request timeout: {}", e))
        } else if e.is_connect() {
            LlmError::network_error(format!("Connection failed: {}", e))
        } else {
            LlmError::network_error(format!("Request failed: {}", e))
        }
    }

    /// Send the request and return the response once its status is known to be good.
    async fn send(&self, request: &CompletionRequest) -> Result<reqwest::Response, LlmError> {
        let body = OpenRouterRequest::from_request(request);

        tracing::debug!(
            "Sending request to OpenRouter: model={} stream={}",
            request.model,
            request.stream
        );

        let response = self
            .client
            .post(self.completions_url())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .header("HTTP-Referer", "http://localhost:3000")
            .header("X-Title", "Task Master CLI")
            .json(&body)
            .send()
            .await
            .map_err(Self::transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(LlmError::from_response(status.as_u16(), &text));
        }

        Ok(response)
    }
}

#[async_trait]
impl CompletionClient for OpenRouterClient {
    fn service_name(&self) -> &str {
        "OpenRouter"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let request = CompletionRequest {
            stream: false,
            ..request.clone()
        };
        let response = self.send(&request).await?;
        let body = response.text().await.map_err(Self::transport_error)?;

        let parsed: OpenRouterResponse = serde_json::from_str(&body).map_err(|e| {
            LlmError::parse_error(format!("Failed to parse response: {}, body: {}", e, body))
        })?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::parse_error("No choices in response"))?;

        if let Some(reason) = &choice.finish_reason {
            tracing::debug!("Completion finished with reason: {}", reason);
        }

        match choice.message.content {
            Some(content) if !content.is_empty() => Ok(content),
            _ => Err(LlmError::parse_error("Empty response content")),
        }
    }

    async fn complete_stream(&self, request: &CompletionRequest) -> Result<TextStream, LlmError> {
        let request = CompletionRequest {
            stream: true,
            ..request.clone()
        };
        let response = self.send(&request).await?;
        let mut bytes = Box::pin(response.bytes_stream());

        let stream = async_stream::stream! {
            let mut decoder = SseDecoder::new();
            'body: while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        yield Err(OpenRouterClient::transport_error(e));
                        break 'body;
                    }
                };
                match decoder.push(&chunk) {
                    Ok(events) => {
                        for event in events {
                            match event {
                                SseEvent::Fragment(text) => {
                                    yield Ok(text);
                                }
                                SseEvent::Done => break 'body,
                            }
                        }
                    }
                    Err(e) => {
                        yield Err(e);
                        break 'body;
                    }
                }
            }
            match decoder.finish() {
                Ok(Some(SseEvent::Fragment(text))) => {
                    yield Ok(text);
                }
                Ok(_) => {}
                Err(e) => {
                    yield Err(e);
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

/// OpenRouter API request format.
#[derive(Debug, Serialize)]
struct OpenRouterRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

impl OpenRouterRequest {
    fn from_request(request: &CompletionRequest) -> Self {
        Self {
            model: request.model.clone(),
            messages: request.messages(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stream: request.stream,
            response_format: request.json_mode.then(|| ResponseFormat {
                format_type: "json_object".to_string(),
            }),
        }
    }
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

/// OpenRouter API response format.
#[derive(Debug, Deserialize)]
struct OpenRouterResponse {
    choices: Vec<OpenRouterChoice>,
}

/// A choice in the OpenRouter response.
#[derive(Debug, Deserialize)]
struct OpenRouterChoice {
    message: OpenRouterMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

/// Message in OpenRouter response.
#[derive(Debug, Deserialize)]
struct OpenRouterMessage {
    content: Option<String>,
}
