//! Core reasoning-service client trait and error type

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::error::AgentError;

/// Stateless reasoning-service client - each call is independent (fresh context)
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send one prompt and return the generated text
    async fn query(&self, prompt: &str) -> Result<String, LlmError>;

    /// Model identifier, for logs and reports
    fn model(&self) -> &str;
}

/// Errors that can occur during a reasoning-service call
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl LlmError {
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::ApiError { status, .. } => *status >= 500 || *status == 429,
            LlmError::Network(_) => true,
            LlmError::InvalidResponse(_) => false,
            LlmError::JsonError(_) => false,
        }
    }
}

impl From<LlmError> for AgentError {
    fn from(err: LlmError) -> Self {
        AgentError::ServiceCall(err.to_string())
    }
}

/// Scripted client for tests and dry runs.
///
/// Replies are handed out in order; once the script runs dry every call fails
/// with `InvalidResponse`. Prompts are recorded for inspection.
pub struct MockLlmClient {
    replies: Mutex<VecDeque<Result<String, String>>>,
    prompts: Mutex<Vec<String>>,
}

impl MockLlmClient {
    /// Create a mock that returns each reply once, in order
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(|r| Ok(r.into())).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock from explicit successes and failures
    pub fn scripted(replies: Vec<Result<String, String>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Prompts received so far
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Number of calls received so far
    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn query(&self, prompt: &str) -> Result<String, LlmError> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(prompt.to_string());

        let next = self.replies.lock().unwrap_or_else(PoisonError::into_inner).pop_front();
        match next {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(LlmError::ApiError { status: 503, message }),
            None => Err(LlmError::InvalidResponse("mock script exhausted".to_string())),
        }
    }

    fn model(&self) -> &str {
        "mock-model"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_returns_in_order() {
        let mock = MockLlmClient::new(["first", "second"]);
        assert_eq!(mock.query("p1").await.unwrap(), "first");
        assert_eq!(mock.query("p2").await.unwrap(), "second");
        assert!(matches!(mock.query("p3").await, Err(LlmError::InvalidResponse(_))));
        assert_eq!(mock.prompts(), vec!["p1", "p2", "p3"]);
        assert_eq!(mock.calls(), 3);
    }

    #[tokio::test]
    async fn test_mock_scripted_failure() {
        let mock = MockLlmClient::scripted(vec![Err("overloaded".into()), Ok("{}".into())]);
        let err = mock.query("p").await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(mock.query("p").await.unwrap(), "{}");
    }

    #[test]
    fn test_llm_error_is_retryable() {
        assert!(
            LlmError::ApiError {
                status: 500,
                message: "Internal error".to_string()
            }
            .is_retryable()
        );
        assert!(
            !LlmError::ApiError {
                status: 404,
                message: "model not found".to_string()
            }
            .is_retryable()
        );
        assert!(!LlmError::InvalidResponse("bad".to_string()).is_retryable());
    }

    #[test]
    fn test_llm_error_into_agent_error() {
        let err: AgentError = LlmError::InvalidResponse("no response field".into()).into();
        assert!(matches!(err, AgentError::ServiceCall(_)));
        assert!(err.to_string().contains("no response field"));
    }
}
