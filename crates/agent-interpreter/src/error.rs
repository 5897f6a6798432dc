//! Error types for sandbox operations

use reqwest::StatusCode;
use thiserror::Error;

/// Errors raised by the sandbox client
///
/// The [`CodeInterpreter`](crate::CodeInterpreter) façade never returns these
/// to its callers; it renders them into the text result instead.
#[derive(Debug, Error)]
pub enum SandboxError {
    /// Invalid or missing configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// The service answered with a non-success status
    #[error("Failed to {context}: {status} {reason}")]
    Http {
        context: &'static str,
        status: u16,
        reason: String,
    },

    /// Network or HTTP transport error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Response body was not the JSON we expected
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Downloaded content was not valid base64
    #[error("Invalid base64 content: {0}")]
    Decode(#[from] base64::DecodeError),

    /// Writing a downloaded file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A success response lacked a required field
    #[error("Response to {context} is missing `{field}`")]
    MissingField {
        context: &'static str,
        field: &'static str,
    },

    /// The sandbox path has no usable file name
    #[error("Invalid sandbox path: {0}")]
    InvalidPath(String),

    /// The event stream could not be consumed
    #[error("Event stream error: {0}")]
    Stream(String),

    /// No execution with this id is remembered
    #[error("Unknown execution: {0}")]
    UnknownExecution(String),
}

impl SandboxError {
    /// Build an HTTP error from a response status
    pub fn http(context: &'static str, status: StatusCode) -> Self {
        Self::Http {
            context,
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
        }
    }
}

/// Result type alias for sandbox operations
pub type Result<T> = std::result::Result<T, SandboxError>;

impl From<SandboxError> for agent_core::Error {
    fn from(err: SandboxError) -> Self {
        match err {
            SandboxError::Config(msg) => agent_core::Error::InitializationFailed(msg),
            other => agent_core::Error::ProcessingFailed(other.to_string()),
        }
    }
}
