//! Error types for deck note generation.

use std::fmt;
use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Message used when a failed response carries no readable error field.
pub const GENERIC_FAILURE_MESSAGE: &str = "request failed";

/// A non-success response (or transport failure) from the notes backend.
///
/// `status` is `None` when no HTTP response was received at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: Option<u16>,
    pub message: String,
}

impl ApiError {
    /// Create an error for an HTTP response with the given status.
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Create an error for a request that never produced a response.
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    /// Build an error from a failed response body.
    ///
    /// Uses the JSON `detail` field, then `message`, and falls back to
    /// [`GENERIC_FAILURE_MESSAGE`] when the body is empty or unparsable.
    pub fn from_body(status: u16, body: &str) -> Self {
        Self::new(status, error_message_from_body(body))
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} (HTTP {})", self.message, status),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for ApiError {}

/// Extract a human-readable message from a JSON error body.
pub fn error_message_from_body(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return GENERIC_FAILURE_MESSAGE.to_string();
    };

    ["detail", "message"]
        .iter()
        .filter_map(|key| value.get(*key))
        .find_map(readable_field)
        .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string())
}

fn readable_field(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        serde_json::Value::Null | serde_json::Value::String(_) => None,
        // FastAPI validation errors put a list of objects under `detail`
        other => Some(other.to_string()),
    }
}

/// Errors that can occur while driving note generation.
#[derive(Error, Debug)]
pub enum Error {
    /// A client-side precondition failed; no request was sent.
    #[error("{0}")]
    Validation(String),

    /// The backend rejected the request or could not be reached.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Failed to read or write a local file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A successful response did not have the expected shape.
    #[error("Unexpected response body: {0}")]
    Decode(String),

    /// The configuration file could not be read or parsed.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Shorthand for a validation failure.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// The user-facing message, without status decoration.
    pub fn message(&self) -> String {
        match self {
            Self::Api(e) => e.message.clone(),
            other => other.to_string(),
        }
    }
}
