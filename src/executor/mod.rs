//! Action executor - the one place external processes are spawned
//!
//! Each call spawns a single process (argv split on whitespace, no shell),
//! waits for it under a deadline, and folds every outcome, including spawn
//! failures and timeouts, into an `ExecutionResult`.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use log::{debug, warn};
use tokio::process::Command;

use crate::domain::{ExecutionResult, ValidatedAction};

/// Runs validated actions as child processes
#[derive(Debug, Clone, Default)]
pub struct ActionExecutor {
    working_dir: Option<PathBuf>,
}

impl ActionExecutor {
    /// Create an executor that runs in the current directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Run every process in `dir`
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: Some(dir.into()),
        }
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }

    /// Execute one validated action
    pub async fn execute(&self, action: &ValidatedAction, timeout: Duration) -> ExecutionResult {
        self.run_command_line(action.as_str(), timeout).await
    }

    /// Execute a trusted command line that did not come from the model.
    ///
    /// Used for collaborator commands such as the test runner.
    pub async fn run_command_line(&self, command_line: &str, timeout: Duration) -> ExecutionResult {
        let mut parts = command_line.split_whitespace();
        let Some(program) = parts.next() else {
            return ExecutionResult::failure(command_line, "empty command");
        };

        let mut cmd = Command::new(program);
        cmd.args(parts)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        debug!("Spawning: {} (timeout {}ms)", command_line, timeout.as_millis());
        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!("Failed to spawn '{}': {}", program, e);
                return ExecutionResult::failure(command_line, format!("failed to spawn {}: {}", program, e));
            }
        };

        // Dropping the future on timeout drops the child, which kills it
        match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                let stdout = String::from_utf8_lossy(&output.stdout).to_string();
                let stderr = String::from_utf8_lossy(&output.stderr).to_string();
                if output.status.success() {
                    debug!("'{}' succeeded ({} bytes stdout)", program, stdout.len());
                    ExecutionResult::success(command_line, stdout, stderr)
                } else {
                    let code = output
                        .status
                        .code()
                        .map(|c| c.to_string())
                        .unwrap_or_else(|| "signal".to_string());
                    let error = if stderr.trim().is_empty() {
                        format!("exit code {}", code)
                    } else {
                        format!("exit code {}: {}", code, stderr.trim())
                    };
                    debug!("'{}' failed: {}", program, error);
                    ExecutionResult::failure_with_output(command_line, stdout, stderr, error)
                }
            }
            Ok(Err(e)) => ExecutionResult::failure(command_line, format!("io error: {}", e)),
            Err(_) => {
                warn!("'{}' timed out after {}ms", command_line, timeout.as_millis());
                ExecutionResult::timed_out(command_line)
            }
        }
    }
}
