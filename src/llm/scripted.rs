//! Completion client that replays canned responses.
//!
//! Test-only. Exercises the generation pipeline without a network: each call
//! pops the next scripted reply and requests are recorded for inspection.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{CompletionClient, CompletionRequest, LlmError, TextStream};

#[derive(Debug, Clone)]
enum Reply {
    Text(String),
    Stream(Vec<String>),
    Fail(LlmError),
}

/// Replays queued replies in order.
#[derive(Debug, Default)]
pub struct ScriptedClient {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a whole-string reply.
    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.push(Reply::Text(text.into()))
    }

    /// Queue a streamed reply made of `fragments`.
    pub fn with_stream<S: Into<String>>(self, fragments: Vec<S>) -> Self {
        self.push(Reply::Stream(fragments.into_iter().map(Into::into).collect()))
    }

    /// Queue a failure.
    pub fn with_error(self, error: LlmError) -> Self {
        self.push(Reply::Fail(error))
    }

    fn push(self, reply: Reply) -> Self {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(reply);
        }
        self
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    fn next_reply(&self, request: &CompletionRequest) -> Result<Reply, LlmError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        self.replies
            .lock()
            .ok()
            .and_then(|mut r| r.pop_front())
            .ok_or_else(|| LlmError::parse_error("No scripted reply left"))
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    fn service_name(&self) -> &str {
        "Scripted"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        match self.next_reply(request)? {
            Reply::Text(text) => Ok(text),
            Reply::Stream(fragments) => Ok(fragments.concat()),
            Reply::Fail(error) => Err(error),
        }
    }

    async fn complete_stream(&self, request: &CompletionRequest) -> Result<TextStream, LlmError> {
        let fragments = match self.next_reply(request)? {
            Reply::Text(text) => vec![text],
            Reply::Stream(fragments) => fragments,
            Reply::Fail(error) => return Err(error),
        };
        Ok(Box::pin(futures::stream::iter(
            fragments.into_iter().map(Ok),
        )))
    }
}
