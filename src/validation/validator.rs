//! Action validator - normalizes proposals and gates them before execution
//!
//! Rules, applied in order:
//! 1. placeholder substitution (commands only)
//! 2. leftover-placeholder, allow-list gate (commands) or syntax gate (code)
//! 3. per-tool repair (commands only)

use log::debug;

use crate::domain::{ActionDomain, ProposedAction, Session, ValidatedAction};
use crate::validation::command::{CommandPolicy, DEFAULT_ALLOWED_TOOLS, DEFAULT_WORDLIST};
use crate::validation::placeholder::{substitute, unresolved};
use crate::validation::syntax::{SourceLanguage, check_syntax};
use crate::validation::Rejection;

/// Configuration for the ActionValidator
#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    /// Tools permitted as the leading token of a command
    pub allowed_tools: Vec<String>,
    /// Wordlist injected into brute-force tools
    pub wordlist: String,
    /// Language code actions must parse as
    pub language: SourceLanguage,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            allowed_tools: DEFAULT_ALLOWED_TOOLS.iter().map(|t| t.to_string()).collect(),
            wordlist: DEFAULT_WORDLIST.to_string(),
            language: SourceLanguage::default(),
        }
    }
}

/// Normalizes and validates proposed actions
#[derive(Debug, Clone)]
pub struct ActionValidator {
    policy: CommandPolicy,
    language: SourceLanguage,
}

impl Default for ActionValidator {
    fn default() -> Self {
        Self::new(ValidatorConfig::default())
    }
}

impl ActionValidator {
    pub fn new(config: ValidatorConfig) -> Self {
        Self {
            policy: CommandPolicy::new(config.allowed_tools, config.wordlist),
            language: config.language,
        }
    }

    pub fn allowed_tools(&self) -> &[String] {
        self.policy.allowed()
    }

    pub fn language(&self) -> SourceLanguage {
        self.language
    }

    /// Apply substitution, the allow-list gate and repairs.
    ///
    /// Code actions are returned unchanged apart from the blank check; their
    /// syntax gate runs in `validate`.
    pub fn normalize(&self, action: &ProposedAction, session: &Session) -> Result<ProposedAction, Rejection> {
        if action.raw.trim().is_empty() {
            return Err(Rejection::Empty);
        }

        match action.domain {
            ActionDomain::Code => Ok(action.clone()),
            ActionDomain::Command => {
                let substituted = substitute(action.raw.trim(), session);
                if let Some(token) = unresolved(&substituted) {
                    return Err(Rejection::Unresolved {
                        placeholder: token.to_string(),
                    });
                }
                self.policy.check_allowed(&substituted)?;
                let repaired = self.policy.repair(&substituted, session);
                Ok(ProposedAction::command(repaired))
            }
        }
    }

    /// Fully validate an action, producing something the executor may run
    pub fn validate(&self, action: &ProposedAction, session: &Session) -> Result<ValidatedAction, Rejection> {
        let normalized = self.normalize(action, session).inspect_err(|rejection| {
            debug!("Rejected {} action: {}", action.domain, rejection);
        })?;

        if normalized.domain == ActionDomain::Code {
            check_syntax(&normalized.raw, self.language)?;
        }

        Ok(ValidatedAction::new(normalized.raw, normalized.domain, normalized.slot))
    }
}
