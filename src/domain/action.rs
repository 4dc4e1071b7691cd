//! Action types flowing through one iteration
//!
//! A reasoning-service response is turned into `ProposedAction`s, the validator
//! turns those into `ValidatedAction`s, and the executor turns those into
//! `ExecutionResult`s. None of these outlive the iteration that produced them.

use serde::{Deserialize, Serialize};

/// Marker carried in `ExecutionResult::error` when an action hit its deadline
pub const TIMEOUT_MARKER: &str = "timed out";

/// Vocabulary of actions a session works with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionDomain {
    /// Source code plus tests, checked by a test runner
    Code,
    /// Shell tool invocations against a target
    Command,
}

impl ActionDomain {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionDomain::Code => "code",
            ActionDomain::Command => "command",
        }
    }
}

impl std::fmt::Display for ActionDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which workspace file a code action becomes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeSlot {
    Solution,
    Tests,
}

/// A candidate action extracted from a response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposedAction {
    pub raw: String,
    pub domain: ActionDomain,
    /// Set for code actions only
    pub slot: Option<CodeSlot>,
}

impl ProposedAction {
    /// Create a command action
    pub fn command(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            domain: ActionDomain::Command,
            slot: None,
        }
    }

    /// Create a code action destined for the given slot
    pub fn code(slot: CodeSlot, source: impl Into<String>) -> Self {
        Self {
            raw: source.into(),
            domain: ActionDomain::Code,
            slot: Some(slot),
        }
    }
}

/// An action that passed the validator.
///
/// Only the validation module constructs these, so holding one means the
/// allow-list gate (or the syntax gate, for code) has been applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidatedAction {
    text: String,
    domain: ActionDomain,
    slot: Option<CodeSlot>,
}

impl ValidatedAction {
    pub(crate) fn new(text: String, domain: ActionDomain, slot: Option<CodeSlot>) -> Self {
        Self { text, domain, slot }
    }

    /// Normalized action text (command line or source)
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn domain(&self) -> ActionDomain {
        self.domain
    }

    pub fn slot(&self) -> Option<CodeSlot> {
        self.slot
    }

    /// Re-wrap as a proposal, e.g. to re-run it through the validator
    pub fn to_proposed(&self) -> ProposedAction {
        ProposedAction {
            raw: self.text.clone(),
            domain: self.domain,
            slot: self.slot,
        }
    }
}

/// Outcome of running one validated action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Echo of the command line that ran
    pub action: String,
    /// Exit code zero and no timeout
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    /// Always `None` when `success` is true
    pub error: Option<String>,
}

impl ExecutionResult {
    /// Create a successful result
    pub fn success(action: impl Into<String>, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            success: true,
            stdout: stdout.into(),
            stderr: stderr.into(),
            error: None,
        }
    }

    /// Create a failed result
    pub fn failure(action: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            success: false,
            stdout: String::new(),
            stderr: String::new(),
            error: Some(error.into()),
        }
    }

    /// Create a failed result that still carries captured output
    pub fn failure_with_output(
        action: impl Into<String>,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            action: action.into(),
            success: false,
            stdout: stdout.into(),
            stderr: stderr.into(),
            error: Some(error.into()),
        }
    }

    /// Create the result for an action that exceeded its deadline
    pub fn timed_out(action: impl Into<String>) -> Self {
        Self::failure(action, TIMEOUT_MARKER)
    }

    pub fn is_timeout(&self) -> bool {
        self.error.as_deref() == Some(TIMEOUT_MARKER)
    }
}

/// Structured decision extracted from one reasoning-service response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterpretedResponse {
    pub analysis: String,
    pub actions: Vec<ProposedAction>,
    /// False means the model signals the task is complete
    pub continuation: bool,
    pub findings: Vec<String>,
}

impl InterpretedResponse {
    /// Response that proposes nothing but asks the loop to keep going
    pub fn empty(analysis: impl Into<String>) -> Self {
        Self {
            analysis: analysis.into(),
            actions: Vec::new(),
            continuation: true,
            findings: Vec::new(),
        }
    }
}
