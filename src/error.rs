//! Error types for agentloop
//!
//! Centralized error handling using thiserror. Each variant corresponds to one
//! boundary of the agent loop so callers branch on a finite taxonomy.

use thiserror::Error;

/// All error types that can occur in agentloop
#[derive(Debug, Error)]
pub enum AgentError {
    /// Reasoning service unreachable at startup (fatal)
    #[error("Connection error: {0}")]
    Connection(String),

    /// A single reasoning-service call failed (recoverable)
    #[error("Service call failed: {0}")]
    ServiceCall(String),

    /// Structured payload could not be decoded (recoverable)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Action refused by the allow-list gate
    #[error("Action rejected: {0}")]
    Rejected(String),

    /// Generated source failed the syntax gate
    #[error("Invalid syntax: {0}")]
    SyntaxInvalid(String),

    /// Invalid or missing configuration
    #[error("Config error: {0}")]
    Config(String),

    /// Prompt template failed to render
    #[error("Template error: {0}")]
    Template(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for agentloop operations
pub type Result<T> = std::result::Result<T, AgentError>;
