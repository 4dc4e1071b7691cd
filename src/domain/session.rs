//! Session record
//!
//! A Session is one run of the agent loop. It owns everything the loop learns
//! (discoveries, findings, per-iteration history) and is handed back to the
//! caller for reporting once the loop reaches a terminal status.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::action::ActionDomain;

/// Status of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Actively iterating
    Running,
    /// Model stopped and (for code) tests passed
    Succeeded,
    /// Model produced nothing to do, or stopped without passing tests
    StoppedByModel,
    /// Iteration cap reached
    Exhausted,
    /// Reasoning service never answered, or an unrecoverable error occurred
    Failed,
}

impl SessionStatus {
    /// Returns true if the session can no longer iterate
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionStatus::Running)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Running => "running",
            SessionStatus::Succeeded => "succeeded",
            SessionStatus::StoppedByModel => "stopped_by_model",
            SessionStatus::Exhausted => "exhausted",
            SessionStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Summary of one iteration, kept for reporting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IterationRecord {
    /// 0-based iteration index
    pub index: u32,
    pub phase: String,
    pub analysis: String,
    pub proposed: usize,
    pub rejected: usize,
    pub executed: usize,
    pub succeeded: usize,
    /// Test-runner verdict (code sessions only)
    pub tests_passed: Option<bool>,
    /// Set when the reasoning service call failed
    pub service_error: Option<String>,
}

impl IterationRecord {
    pub fn new(index: u32, phase: impl Into<String>) -> Self {
        Self {
            index,
            phase: phase.into(),
            analysis: String::new(),
            proposed: 0,
            rejected: 0,
            executed: 0,
            succeeded: 0,
            tests_passed: None,
            service_error: None,
        }
    }
}

/// One run of the agent loop
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    //=== Identity ===
    /// Host for command sessions, task description for code sessions
    pub target: String,

    /// Port substituted into command placeholders
    pub port: Option<u16>,

    pub domain: ActionDomain,

    //=== Budget ===
    /// Current iteration (0-based, increments when an iteration is consumed)
    pub iteration: u32,

    pub max_iterations: u32,

    //=== Runtime State ===
    pub status: SessionStatus,

    /// Action key to captured output; re-running an action overwrites in place
    pub discoveries: IndexMap<String, String>,

    /// Free-form findings reported by the model, append-only
    pub findings: Vec<String>,

    pub history: Vec<IterationRecord>,

    /// Reasoning-service calls attempted
    pub service_calls: u32,

    /// Reasoning-service calls that returned text
    pub successful_calls: u32,

    pub last_analysis: String,
}

impl Session {
    /// Create a session that runs shell tools against `host`
    pub fn for_commands(host: impl Into<String>, port: Option<u16>, max_iterations: u32) -> Self {
        Self::new(ActionDomain::Command, host, port, max_iterations)
    }

    /// Create a session that writes code for `task`
    pub fn for_code(task: impl Into<String>, max_iterations: u32) -> Self {
        Self::new(ActionDomain::Code, task, None, max_iterations)
    }

    pub fn new(domain: ActionDomain, target: impl Into<String>, port: Option<u16>, max_iterations: u32) -> Self {
        Self {
            target: target.into(),
            port,
            domain,
            iteration: 0,
            max_iterations,
            status: SessionStatus::Running,
            discoveries: IndexMap::new(),
            findings: Vec::new(),
            history: Vec::new(),
            service_calls: 0,
            successful_calls: 0,
            last_analysis: String::new(),
        }
    }

    /// `host:port` when a port is set, otherwise the bare target
    pub fn address(&self) -> String {
        match self.port {
            Some(port) => format!("{}:{}", self.target, port),
            None => self.target.clone(),
        }
    }

    /// HTTP URL for the target
    pub fn url(&self) -> String {
        format!("http://{}", self.address())
    }

    /// Record the output of a successful action
    pub fn record_discovery(&mut self, key: impl Into<String>, output: impl Into<String>) {
        self.discoveries.insert(key.into(), output.into());
    }

    /// Append findings in the order reported
    pub fn add_findings<I, S>(&mut self, findings: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.findings.extend(findings.into_iter().map(Into::into));
    }

    /// Number of iterations that actually ran
    pub fn iterations_run(&self) -> usize {
        self.history.len()
    }
}
