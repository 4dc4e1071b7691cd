//! Validation System
//!
//! Provides the gate every proposed action passes before it may run:
//! - placeholder: target/port/url substitution
//! - command: allow-list gate and per-tool repairs
//! - syntax: tree-sitter syntax gate for generated code
//! - validator: ActionValidator combining the above

pub mod command;
pub mod placeholder;
pub mod syntax;
pub mod validator;

use thiserror::Error;

use crate::error::AgentError;

pub use command::{CommandPolicy, DEFAULT_ALLOWED_TOOLS, DEFAULT_WORDLIST};
pub use syntax::{SourceLanguage, check_syntax};
pub use validator::{ActionValidator, ValidatorConfig};

/// Why an action was refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("empty action")]
    Empty,

    #[error("'{tool}' not permitted")]
    NotPermitted { tool: String },

    #[error("unresolved placeholder '{placeholder}'")]
    Unresolved { placeholder: String },

    #[error("{language} syntax error at {line}:{column}: {message}")]
    SyntaxInvalid {
        language: SourceLanguage,
        line: usize,
        column: usize,
        message: String,
    },
}

impl From<Rejection> for AgentError {
    fn from(rejection: Rejection) -> Self {
        match rejection {
            Rejection::SyntaxInvalid { .. } => AgentError::SyntaxInvalid(rejection.to_string()),
            other => AgentError::Rejected(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_into_agent_error() {
        let err: AgentError = Rejection::NotPermitted { tool: "rm".into() }.into();
        assert!(matches!(err, AgentError::Rejected(_)));
        assert_eq!(err.to_string(), "Action rejected: 'rm' not permitted");

        let err: AgentError = Rejection::SyntaxInvalid {
            language: SourceLanguage::Python,
            line: 3,
            column: 7,
            message: "unexpected `:`".into(),
        }
        .into();
        assert!(matches!(err, AgentError::SyntaxInvalid(_)));
        assert!(err.to_string().contains("3:7"));
    }
}
