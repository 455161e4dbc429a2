//! Error Types

use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Agent error types
///
/// Only adapter-level and configuration failures surface through these.
/// Tool failures are captured as [`ToolError`] and handed back to the model.
#[derive(Error, Debug)]
pub enum AgentError {
    /// Model adapter error
    #[error("Provider error: {0}")]
    Provider(String),

    /// Provider unavailable or not responding
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Provider answered with a non-success transport status
    #[error("Provider returned status {status}: {body}")]
    ProviderStatus { status: u16, body: String },

    /// Malformed provider reply
    #[error("Parse error: {0}")]
    Parse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Optional turn guard reached
    #[error("Maximum turns ({0}) reached")]
    MaxTurns(usize),

    /// Session error
    #[error("Session error: {0}")]
    Session(String),

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other/unknown error
    #[error("{0}")]
    Other(String),
}

impl AgentError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            AgentError::ProviderUnavailable(_) | AgentError::Io(_) => true,
            AgentError::ProviderStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            AgentError::Provider(msg) => format!("The AI service encountered an error: {}", msg),
            AgentError::ProviderUnavailable(_) => "The AI service is currently unavailable. Please try again.".into(),
            AgentError::ProviderStatus { status: 429, .. } => "You've made too many requests. Please wait a moment.".into(),
            AgentError::ProviderStatus { status, .. } => format!("The AI service rejected the request (status {}).", status),
            AgentError::Parse(_) => "The AI service returned a response that could not be understood.".into(),
            AgentError::MaxTurns(_) => "The request took too long to process. Please try a simpler query.".into(),
            _ => "An unexpected error occurred.".into(),
        }
    }
}

impl From<anyhow::Error> for AgentError {
    fn from(err: anyhow::Error) -> Self {
        AgentError::Other(err.to_string())
    }
}

/// Failure of a single tool call
///
/// Never propagated out of the agent loop: the loop serializes it into the
/// tool result so the model can react on its next turn.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    /// No tool with this name is registered
    #[error("Tool not found: {0}")]
    NotFound(String),

    /// Arguments rejected before execution
    #[error("Tool validation error: {0}")]
    Validation(String),

    /// The tool raised while executing
    #[error("Tool execution error: {0}")]
    Execution(String),
}

impl ToolError {
    /// Stable tag used in serialized failure payloads
    pub fn kind(&self) -> &'static str {
        match self {
            ToolError::NotFound(_) => "not_found",
            ToolError::Validation(_) => "validation",
            ToolError::Execution(_) => "execution",
        }
    }
}

impl From<serde_json::Error> for ToolError {
    fn from(err: serde_json::Error) -> Self {
        ToolError::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable() {
        assert!(AgentError::ProviderUnavailable("down".into()).is_retryable());
        assert!(AgentError::ProviderStatus { status: 503, body: String::new() }.is_retryable());
        assert!(!AgentError::ProviderStatus { status: 400, body: String::new() }.is_retryable());
        assert!(!AgentError::Config("x".into()).is_retryable());
    }

    #[test]
    fn test_tool_error_kind() {
        assert_eq!(ToolError::NotFound("x".into()).kind(), "not_found");
        assert_eq!(ToolError::Execution("boom".into()).to_string(), "Tool execution error: boom");
    }
}
