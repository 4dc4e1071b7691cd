//! Test runner for code sessions.
//!
//! Runs the configured test command in the workspace through the action
//! executor, so it shares the executor's no-shell, deadline-bounded behavior.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info};

use crate::executor::ActionExecutor;

/// Default test command
pub const DEFAULT_TEST_COMMAND: &str = "python3 -m pytest tests.py -v";

/// pytest invocation for a tests file
pub fn pytest_command(tests_file: &str) -> String {
    format!("python3 -m pytest {} -v", tests_file)
}

/// Result of running the tests once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestOutcome {
    /// Whether the tests passed.
    pub success: bool,

    /// Raw stdout output.
    pub stdout: String,

    /// Raw stderr output.
    pub stderr: String,
}

impl TestOutcome {
    pub fn pass(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn fail(stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// Last pytest-style summary line (`=== 1 failed, 2 passed in 0.1s ===`), if any
    pub fn summary(&self) -> Option<&str> {
        self.stdout
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| line.starts_with('=') && line.ends_with('=') && line.contains(" in "))
    }
}

/// Runs the tests of a code workspace
#[async_trait]
pub trait TestRunner: Send + Sync {
    async fn run_tests(&self) -> TestOutcome;
}

/// Configuration for the command test runner.
#[derive(Debug, Clone)]
pub struct TestRunnerConfig {
    /// The command to run, split on whitespace.
    pub command: String,

    /// Timeout for the command.
    pub timeout: Duration,
}

impl Default for TestRunnerConfig {
    fn default() -> Self {
        Self {
            command: DEFAULT_TEST_COMMAND.to_string(),
            timeout: Duration::from_secs(300),
        }
    }
}

impl TestRunnerConfig {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Runs a test command inside a directory
pub struct CommandTestRunner {
    config: TestRunnerConfig,
    executor: ActionExecutor,
}

impl CommandTestRunner {
    pub fn new(dir: impl Into<PathBuf>, config: TestRunnerConfig) -> Self {
        Self {
            config,
            executor: ActionExecutor::in_dir(dir),
        }
    }

    /// Get the command being run.
    pub fn command(&self) -> &str {
        &self.config.command
    }
}

#[async_trait]
impl TestRunner for CommandTestRunner {
    async fn run_tests(&self) -> TestOutcome {
        debug!("Running tests: {}", self.config.command);
        let result = self
            .executor
            .run_command_line(&self.config.command, self.config.timeout)
            .await;

        if result.success {
            info!("Tests passed");
            return TestOutcome::pass(result.stdout);
        }

        let mut stderr = result.stderr;
        if let Some(error) = result.error {
            if !stderr.is_empty() && !stderr.ends_with('\n') {
                stderr.push('\n');
            }
            stderr.push_str(&error);
        }
        info!("Tests failed");
        TestOutcome::fail(result.stdout, stderr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_summary_line() {
        let outcome = TestOutcome::fail(
            "tests.py::test_a PASSED\ntests.py::test_b FAILED\n===== 1 failed, 1 passed in 0.03s =====\n",
            "",
        );
        assert_eq!(outcome.summary(), Some("===== 1 failed, 1 passed in 0.03s ====="));
        assert_eq!(TestOutcome::pass("ok").summary(), None);
    }

    #[tokio::test]
    async fn test_passing_command() {
        let dir = TempDir::new().unwrap();
        let runner = CommandTestRunner::new(dir.path(), TestRunnerConfig::new("true"));
        let outcome = runner.run_tests().await;
        assert!(outcome.success);
    }

    #[tokio::test]
    async fn test_failing_command() {
        let dir = TempDir::new().unwrap();
        let runner = CommandTestRunner::new(dir.path(), TestRunnerConfig::new("false"));
        let outcome = runner.run_tests().await;
        assert!(!outcome.success);
        assert!(outcome.stderr.contains("exit code 1"));
    }

    #[tokio::test]
    async fn test_missing_program() {
        let dir = TempDir::new().unwrap();
        let runner = CommandTestRunner::new(dir.path(), TestRunnerConfig::new("definitely-not-a-test-runner-xyz"));
        let outcome = runner.run_tests().await;
        assert!(!outcome.success);
        assert!(outcome.stderr.contains("failed to spawn"));
    }

    #[tokio::test]
    async fn test_runs_in_workspace_dir() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("tests.py"), "x").unwrap();
        let runner = CommandTestRunner::new(dir.path(), TestRunnerConfig::new("ls tests.py"));
        let outcome = runner.run_tests().await;
        assert!(outcome.success);
        assert!(outcome.stdout.contains("tests.py"));
    }

    #[test]
    fn test_default_config() {
        let config = TestRunnerConfig::default();
        assert_eq!(config.command, "python3 -m pytest tests.py -v");
        assert_eq!(config.timeout, Duration::from_secs(300));
    }
}
