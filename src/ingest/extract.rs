//! Structured data extraction from free-form model output.
//!
//! [`BracketExtractor`] takes the span from the first opening bracket to the
//! last closing bracket of the same kind and parses it. It does not attempt
//! to balance brackets; prose containing stray brackets after the payload
//! makes the span unparseable, which is reported as malformed output.

use serde_json::Value;

use crate::error::Error;

/// What the caller expects to find in the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// A `{...}` value.
    Object,
    /// A `[...]` value.
    Array,
    /// A `[...]` value, or when no `[...]` span exists, a `{...}` carrying a
    /// `subtasks` array.
    SubtaskArray,
}

/// Result of an extraction attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    Parsed(Value),
    Malformed(String),
}

impl Extraction {
    /// Convert into a value, keeping `raw` for diagnostics on failure.
    pub fn into_value(self, raw: &str) -> Result<Value, Error> {
        match self {
            Extraction::Parsed(value) => Ok(value),
            Extraction::Malformed(reason) => {
                tracing::debug!("Raw AI response: {}", raw);
                Err(Error::malformed(reason, raw))
            }
        }
    }

    pub fn is_parsed(&self) -> bool {
        matches!(self, Extraction::Parsed(_))
    }
}

/// Finds and parses structured data inside model output.
pub trait ResponseExtractor: Send + Sync {
    fn extract(&self, text: &str, shape: Shape) -> Extraction;
}

/// First-open / last-close bracket heuristic.
#[derive(Debug, Clone, Copy, Default)]
pub struct BracketExtractor;

impl BracketExtractor {
    fn span(text: &str, open: char, close: char) -> Result<&str, String> {
        let (Some(start), Some(end)) = (text.find(open), text.rfind(close)) else {
            return Err(format!("no {}...{} structure found", open, close));
        };
        if end < start {
            return Err(format!("'{}' closes before '{}' opens", close, open));
        }
        Ok(&text[start..=end])
    }

    fn parse_span(text: &str, open: char, close: char) -> Extraction {
        match Self::span(text, open, close) {
            Ok(span) => match serde_json::from_str(span) {
                Ok(value) => Extraction::Parsed(value),
                Err(e) => Extraction::Malformed(format!("invalid JSON: {}", e)),
            },
            Err(reason) => Extraction::Malformed(reason),
        }
    }
}

impl ResponseExtractor for BracketExtractor {
    fn extract(&self, text: &str, shape: Shape) -> Extraction {
        match shape {
            Shape::Object => Self::parse_span(text, '{', '}'),
            Shape::Array => Self::parse_span(text, '[', ']'),
            // The wrapping object is only consulted when no array span exists.
            Shape::SubtaskArray => match Self::span(text, '[', ']') {
                Ok(_) => Self::parse_span(text, '[', ']'),
                Err(array_reason) => {
                    match Self::parse_span(text, '{', '}') {
                        Extraction::Parsed(mut object) => match object.get_mut("subtasks") {
                            Some(subtasks) if subtasks.is_array() => {
                                Extraction::Parsed(subtasks.take())
                            }
                            _ => Extraction::Malformed(
                                "found a JSON object without a \"subtasks\" array".into(),
                            ),
                        },
                        Extraction::Malformed(_) => Extraction::Malformed(array_reason),
                    }
                }
            },
        }
    }
}
