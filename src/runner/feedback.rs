//! Feedback carried from one iteration into the next prompt.
//!
//! The service sees no conversation history, only this text. Each entry
//! records one thing that happened: an output, a failure, a rejection or a
//! test run. Clipping happens when the prompt is built, not here.

use crate::domain::ExecutionResult;
use crate::error::AgentError;
use crate::validation::Rejection;
use crate::workspace::TestOutcome;

/// Collects one iteration's feedback entries
#[derive(Debug, Clone, Default)]
pub struct FeedbackBuilder {
    entries: Vec<String>,
}

impl FeedbackBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, text: String) {
        self.entries.push(text);
    }

    pub fn service_error(&mut self, error: &AgentError) {
        self.push(format!("The previous request to the reasoning service failed: {}", error));
    }

    pub fn rejected(&mut self, raw: &str, reason: &Rejection) {
        self.push(format!("Rejected `{}`: {}", raw.trim(), reason));
    }

    pub fn syntax(&mut self, file: &str, reason: &Rejection) {
        self.push(format!("{} was not written: {}", file, reason));
    }

    /// Record one execution, success or not
    pub fn result(&mut self, result: &ExecutionResult) {
        if result.success {
            let stdout = result.stdout.trim_end();
            let text = if stdout.is_empty() {
                format!("$ {}\n(no output)", result.action)
            } else {
                format!("$ {}\n{}", result.action, stdout)
            };
            self.push(text);
        } else if result.is_timeout() {
            self.push(format!("$ {}\ntimed out", result.action));
        } else {
            let mut text = format!(
                "$ {}\nfailed: {}",
                result.action,
                result.error.as_deref().unwrap_or("unknown error")
            );
            let stdout = result.stdout.trim_end();
            if !stdout.is_empty() {
                text.push('\n');
                text.push_str(stdout);
            }
            self.push(text);
        }
    }

    pub fn tests(&mut self, outcome: &TestOutcome) {
        let verdict = if outcome.success { "Tests passed" } else { "Tests failed" };
        let mut text = match outcome.summary() {
            Some(summary) => format!("{} ({})", verdict, summary.trim_matches('=').trim()),
            None => verdict.to_string(),
        };
        if !outcome.success {
            for stream in [&outcome.stdout, &outcome.stderr] {
                let stream = stream.trim_end();
                if !stream.is_empty() {
                    text.push('\n');
                    text.push_str(stream);
                }
            }
        }
        self.push(text);
    }

    /// Join the entries into the text handed to the next prompt
    pub fn build(&self) -> Option<String> {
        if self.entries.is_empty() {
            return None;
        }
        Some(self.entries.join("\n\n"))
    }
}
