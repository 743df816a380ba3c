//! Crate-wide error type.

use std::path::PathBuf;

use crate::llm::LlmError;

/// Errors surfaced by task graph operations and the generation pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transport, authentication, rate-limit or permission failure from the
    /// completion service, after any retries.
    #[error("{0}")]
    Llm(#[from] LlmError),

    /// No structured data could be found in, or validated from, model output.
    #[error("AI response was not in the expected format: {reason}")]
    MalformedOutput { reason: String, raw: String },

    /// The mutation would break id uniqueness or introduce a dependency cycle.
    #[error("{0}")]
    StructuralViolation(String),

    /// A referenced task or subtask does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// Caller-supplied value could not be understood.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The completion pipeline gave up without a usable response.
    #[error("Failed to get a response from the AI service")]
    GenerationFailed,

    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid document {path}: {source}")]
    Document {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl Error {
    pub fn malformed(reason: impl Into<String>, raw: impl Into<String>) -> Self {
        Error::MalformedOutput {
            reason: reason.into(),
            raw: raw.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// Raw model text kept for diagnostics, if this error carries one.
    pub fn raw_output(&self) -> Option<&str> {
        match self {
            Error::MalformedOutput { raw, .. } => Some(raw),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
