//! Completion error types with user-facing classification.
//!
//! Errors carry the service-reported `{type, message}` pair when one is
//! available, otherwise a class derived from the HTTP status or transport
//! failure.

/// Error from completion API calls.
#[derive(Debug, Clone)]
pub struct LlmError {
    /// The kind of error
    pub kind: LlmErrorKind,
    /// HTTP status code, if applicable
    pub status_code: Option<u16>,
    /// Error message
    pub message: String,
}

impl LlmError {
    pub fn new(kind: LlmErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status_code: None,
            message: message.into(),
        }
    }

    /// Create a rate limit error.
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: LlmErrorKind::RateLimited,
            status_code: Some(429),
            message: message.into(),
        }
    }

    /// Create a network error.
    pub fn network_error(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::Network, message)
    }

    /// Create a timeout error.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::Timeout, message)
    }

    /// Create a parse error.
    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::Parse, message)
    }

    /// Build an error from an HTTP status and response body.
    ///
    /// A structured `{"error": {"type", "message"}}` body wins over the bare
    /// status code.
    pub fn from_response(status: u16, body: &str) -> Self {
        let mut error = match ApiErrorBody::parse(body) {
            Some(api) => Self::new(
                api.kind().unwrap_or_else(|| classify_http_status(status)),
                api.message.unwrap_or_else(|| body.to_string()),
            ),
            None => Self::new(classify_http_status(status), body.to_string()),
        };
        error.status_code = Some(status);
        error
    }

    /// Build an error from a payload embedded in an otherwise successful stream.
    pub fn from_stream_payload(payload: &serde_json::Value) -> Self {
        let error = payload.get("error").unwrap_or(payload);
        let kind = error
            .get("type")
            .and_then(|t| t.as_str())
            .and_then(kind_from_api_type)
            .or_else(|| {
                error
                    .get("code")
                    .and_then(|c| c.as_u64())
                    .map(|c| classify_http_status(c as u16))
            })
            .unwrap_or(LlmErrorKind::Api);
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        Self::new(kind, message)
    }

    /// Render a message suitable for showing to the person running the command.
    pub fn user_message(&self, service: &str) -> String {
        match self.kind {
            LlmErrorKind::InvalidRequest => format!(
                "Invalid request to {}: {}. Please check parameters.",
                service, self.message
            ),
            LlmErrorKind::Authentication => format!(
                "Authentication error with {}. Please check your API key (OPENROUTER_API_KEY).",
                service
            ),
            LlmErrorKind::Permission => format!(
                "Permission denied for {}. Check your API key permissions.",
                service
            ),
            LlmErrorKind::RateLimited => format!(
                "Rate limit exceeded for {}. Please wait and try again. {}",
                service, self.message
            ),
            LlmErrorKind::Overloaded => format!(
                "{} is overloaded right now. Please try again later. {}",
                service, self.message
            ),
            LlmErrorKind::ServiceUnavailable => format!(
                "{} is currently unavailable or experiencing issues. Please try again later. {}",
                service, self.message
            ),
            LlmErrorKind::Timeout => {
                format!("The request to {} timed out. Please try again.", service)
            }
            LlmErrorKind::Network => format!(
                "There was a network error connecting to {}. Please check your internet connection and API endpoint.",
                service
            ),
            LlmErrorKind::Parse | LlmErrorKind::Api => format!(
                "Error communicating with {}: {}",
                service, self.message
            ),
        }
    }
}

impl std::fmt::Display for LlmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status_code {
            Some(code) => write!(f, "{} (HTTP {}): {}", self.kind, code, self.message),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

impl std::error::Error for LlmError {}

/// Classification of completion errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmErrorKind {
    /// Malformed request (400, `invalid_request_error`)
    InvalidRequest,
    /// Bad or missing API key (401, `authentication_error`)
    Authentication,
    /// Key lacks access to the model (403, `permission_error`)
    Permission,
    /// Rate limited (429, `rate_limit_error`)
    RateLimited,
    /// Provider overloaded (529, `overloaded_error`)
    Overloaded,
    /// Server error (5xx, `api_error`, `internal_server_error`)
    ServiceUnavailable,
    /// Request did not complete in time
    Timeout,
    /// Connection failed or dropped
    Network,
    /// Response body could not be decoded
    Parse,
    /// Service-reported error of an unrecognised type
    Api,
}

impl std::fmt::Display for LlmErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmErrorKind::InvalidRequest => write!(f, "Invalid request"),
            LlmErrorKind::Authentication => write!(f, "Authentication error"),
            LlmErrorKind::Permission => write!(f, "Permission denied"),
            LlmErrorKind::RateLimited => write!(f, "Rate limit exceeded"),
            LlmErrorKind::Overloaded => write!(f, "Service overloaded"),
            LlmErrorKind::ServiceUnavailable => write!(f, "Service unavailable"),
            LlmErrorKind::Timeout => write!(f, "Request timed out"),
            LlmErrorKind::Network => write!(f, "Network error"),
            LlmErrorKind::Parse => write!(f, "Malformed response"),
            LlmErrorKind::Api => write!(f, "API error"),
        }
    }
}

/// Parse HTTP status code into error kind.
pub fn classify_http_status(status: u16) -> LlmErrorKind {
    match status {
        400 | 422 => LlmErrorKind::InvalidRequest,
        401 => LlmErrorKind::Authentication,
        403 => LlmErrorKind::Permission,
        408 => LlmErrorKind::Timeout,
        429 => LlmErrorKind::RateLimited,
        529 => LlmErrorKind::Overloaded,
        500..=599 => LlmErrorKind::ServiceUnavailable,
        _ => LlmErrorKind::Api,
    }
}

fn kind_from_api_type(error_type: &str) -> Option<LlmErrorKind> {
    match error_type {
        "invalid_request_error" => Some(LlmErrorKind::InvalidRequest),
        "authentication_error" => Some(LlmErrorKind::Authentication),
        "permission_error" => Some(LlmErrorKind::Permission),
        "rate_limit_error" => Some(LlmErrorKind::RateLimited),
        "overloaded_error" => Some(LlmErrorKind::Overloaded),
        "api_error" | "internal_server_error" => Some(LlmErrorKind::ServiceUnavailable),
        _ => None,
    }
}

/// The `{"error": {...}}` envelope returned by OpenAI-compatible services.
#[derive(Debug, serde::Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, serde::Deserialize)]
struct ApiErrorBody {
    #[serde(rename = "type", default)]
    error_type: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ApiErrorBody {
    fn parse(body: &str) -> Option<Self> {
        serde_json::from_str::<ApiErrorEnvelope>(body)
            .ok()
            .map(|e| e.error)
    }

    fn kind(&self) -> Option<LlmErrorKind> {
        self.error_type.as_deref().and_then(kind_from_api_type)
    }
}
