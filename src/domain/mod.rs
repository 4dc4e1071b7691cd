//! Domain types for agentloop
//!
//! This module contains the core domain types:
//! - Session: one run of the loop, with discoveries, findings and history
//! - ProposedAction / ValidatedAction: actions before and after the validator
//! - ExecutionResult: outcome of running one action
//! - InterpretedResponse: structured decision parsed from model output

pub mod action;
pub mod session;

pub use action::{
    ActionDomain, CodeSlot, ExecutionResult, InterpretedResponse, ProposedAction, TIMEOUT_MARKER, ValidatedAction,
};
pub use session::{IterationRecord, Session, SessionStatus};
