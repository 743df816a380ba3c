//! Server-sent event decoding and fragment accumulation.

use futures::StreamExt;

use super::{LlmError, TextStream};

/// One decoded event from an SSE body.
#[derive(Debug, Clone, PartialEq)]
pub enum SseEvent {
    /// Text carried by `choices[0].delta.content`.
    Fragment(String),
    /// The `data: [DONE]` terminator.
    Done,
}

/// Incremental decoder for OpenAI-compatible streaming bodies.
///
/// Bytes may arrive split anywhere, including inside a UTF-8 sequence or a
/// JSON payload, so only complete lines are decoded.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes and return every event completed by them.
    pub fn push(&mut self, bytes: &[u8]) -> Result<Vec<SseEvent>, LlmError> {
        self.buffer.extend_from_slice(bytes);
        let mut events = Vec::new();

        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            if let Some(event) = decode_line(line.trim_end_matches(['\r', '\n']))? {
                events.push(event);
            }
        }

        Ok(events)
    }

    /// Decode whatever is left once the body has ended.
    pub fn finish(&mut self) -> Result<Option<SseEvent>, LlmError> {
        if self.buffer.is_empty() {
            return Ok(None);
        }
        let rest = std::mem::take(&mut self.buffer);
        let line = String::from_utf8_lossy(&rest);
        decode_line(line.trim())
    }
}

fn decode_line(line: &str) -> Result<Option<SseEvent>, LlmError> {
    // Comments (": keep-alive") and event/id fields carry no text.
    let Some(data) = line.strip_prefix("data:") else {
        return Ok(None);
    };
    let data = data.trim_start();

    if data == "[DONE]" {
        return Ok(Some(SseEvent::Done));
    }
    if data.is_empty() {
        return Ok(None);
    }

    let chunk: serde_json::Value = serde_json::from_str(data)
        .map_err(|e| LlmError::parse_error(format!("Invalid stream chunk: {}: {}", e, data)))?;

    if chunk.get("error").is_some() {
        return Err(LlmError::from_stream_payload(&chunk));
    }

    let content = chunk
        .pointer("/choices/0/delta/content")
        .and_then(|c| c.as_str())
        .filter(|c| !c.is_empty());

    Ok(content.map(|c| SseEvent::Fragment(c.to_string())))
}

/// Concatenate a fragment stream in arrival order.
pub async fn collect_stream(mut stream: TextStream) -> Result<String, LlmError> {
    let mut text = String::new();
    while let Some(fragment) = stream.next().await {
        text.push_str(&fragment?);
    }
    Ok(text)
}
