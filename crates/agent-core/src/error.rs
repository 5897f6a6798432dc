//! Error types for agent-core

use thiserror::Error;

/// Result type alias for agent-core
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for agent and tool operations
#[derive(Error, Debug)]
pub enum Error {
    /// Component initialization failed (bad configuration, missing credentials)
    #[error("Initialization failed: {0}")]
    InitializationFailed(String),

    /// Processing a request failed
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),

    /// Tool parameters did not match the tool's input schema
    #[error("Invalid parameters for tool '{tool}': {reason}")]
    InvalidParameters { tool: String, reason: String },

    /// No tool is registered under the requested name
    #[error("Tool not found: {0}")]
    ToolNotFound(String),
}
