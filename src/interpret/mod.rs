//! Response interpreter - turns raw service text into an InterpretedResponse
//!
//! Two tiers: the structured tier decodes an embedded JSON object; when that
//! fails the heuristic tier scans free text (commands) or substitutes a fixed
//! safe action pair (code). Interpretation never fails.

pub mod heuristic;
pub mod structured;

use log::{debug, warn};

use crate::domain::{ActionDomain, CodeSlot, InterpretedResponse, ProposedAction, Session};
use crate::validation::{ActionValidator, Rejection};

pub use structured::{Payload, object_span};

/// Analysis text used whenever the heuristic tier produced the response
pub const AUTOMATIC_ANALYSIS: &str = "automatic analysis";

const DEFAULT_FALLBACK_SOLUTION: &str = "def factorial(n):
    if n < 0:
        raise ValueError('Factorial is not defined for negative numbers')
    if n <= 1:
        return 1
    return n * factorial(n - 1)
";

const DEFAULT_FALLBACK_TESTS: &str = "import pytest

from solution import factorial


def test_factorial():
    assert factorial(0) == 1
    assert factorial(1) == 1
    assert factorial(5) == 120
    with pytest.raises(ValueError):
        factorial(-1)
";

/// Code pair proposed when a code response cannot be decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeFallback {
    pub solution: String,
    pub tests: String,
}

impl Default for CodeFallback {
    fn default() -> Self {
        Self {
            solution: DEFAULT_FALLBACK_SOLUTION.to_string(),
            tests: DEFAULT_FALLBACK_TESTS.to_string(),
        }
    }
}

/// An action the normalizer refused during interpretation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedAction {
    pub raw: String,
    pub reason: Rejection,
}

/// Interprets service responses for one validator configuration
#[derive(Debug, Clone, Default)]
pub struct ResponseInterpreter {
    validator: ActionValidator,
    fallback: CodeFallback,
}

impl ResponseInterpreter {
    pub fn new(validator: ActionValidator) -> Self {
        Self {
            validator,
            fallback: CodeFallback::default(),
        }
    }

    /// Replace the code pair used by the heuristic tier
    pub fn with_fallback(mut self, fallback: CodeFallback) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn validator(&self) -> &ActionValidator {
        &self.validator
    }

    /// Interpret `raw`, dropping actions the normalizer rejects
    pub fn interpret(&self, raw: &str, session: &Session) -> InterpretedResponse {
        self.interpret_with_drops(raw, session).0
    }

    /// Interpret `raw` and also report which actions were dropped and why
    pub fn interpret_with_drops(&self, raw: &str, session: &Session) -> (InterpretedResponse, Vec<DroppedAction>) {
        match structured::parse(raw, session.domain) {
            Ok(payload) => self.accept(payload, session),
            Err(e) => {
                debug!("Structured tier failed ({}), using heuristic tier", e);
                self.heuristic(raw, session)
            }
        }
    }

    fn accept(&self, payload: Payload, session: &Session) -> (InterpretedResponse, Vec<DroppedAction>) {
        let (analysis, proposals, continuation, findings) = match payload {
            Payload::Command {
                analysis,
                commands,
                continuation,
                findings,
            } => (
                analysis,
                commands.into_iter().map(ProposedAction::command).collect::<Vec<_>>(),
                continuation,
                findings,
            ),
            Payload::Code {
                code,
                tests,
                analysis,
                continuation,
                findings,
            } => (
                analysis,
                vec![
                    ProposedAction::code(CodeSlot::Solution, code),
                    ProposedAction::code(CodeSlot::Tests, tests),
                ],
                continuation,
                findings,
            ),
        };

        let (actions, dropped) = self.normalize_all(proposals, session, false);
        let response = InterpretedResponse {
            analysis,
            actions,
            continuation,
            findings,
        };
        (response, dropped)
    }

    fn heuristic(&self, raw: &str, session: &Session) -> (InterpretedResponse, Vec<DroppedAction>) {
        let proposals: Vec<ProposedAction> = match session.domain {
            ActionDomain::Command => heuristic::candidate_lines(raw, self.validator.allowed_tools())
                .into_iter()
                .map(ProposedAction::command)
                .collect(),
            ActionDomain::Code => {
                warn!("Could not decode a code response, proposing the fallback pair");
                vec![
                    ProposedAction::code(CodeSlot::Solution, self.fallback.solution.clone()),
                    ProposedAction::code(CodeSlot::Tests, self.fallback.tests.clone()),
                ]
            }
        };

        let (actions, dropped) = self.normalize_all(proposals, session, true);
        let mut response = InterpretedResponse::empty(AUTOMATIC_ANALYSIS);
        response.actions = actions;
        (response, dropped)
    }

    fn normalize_all(
        &self,
        proposals: Vec<ProposedAction>,
        session: &Session,
        dedupe: bool,
    ) -> (Vec<ProposedAction>, Vec<DroppedAction>) {
        let mut actions: Vec<ProposedAction> = Vec::new();
        let mut dropped = Vec::new();

        for proposal in proposals {
            match self.validator.normalize(&proposal, session) {
                Ok(action) => {
                    if dedupe && actions.contains(&action) {
                        continue;
                    }
                    actions.push(action);
                }
                Err(reason) => {
                    debug!("Dropping proposed action {:?}: {}", proposal.raw, reason);
                    dropped.push(DroppedAction {
                        raw: proposal.raw,
                        reason,
                    });
                }
            }
        }

        (actions, dropped)
    }
}
