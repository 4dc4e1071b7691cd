//! agentloop - an iterative agent loop driven by a reasoning service
//!
//! Each iteration renders a phase-aware prompt, asks the service for the next
//! actions, interprets and validates the reply, executes what passes the gates
//! and feeds the results into the next iteration. Two action domains share one
//! controller: shell commands against a target, and generated code checked by
//! a test runner.

pub mod domain;
pub mod error;
pub mod executor;
pub mod interpret;
pub mod llm;
pub mod prompt;
pub mod report;
pub mod runner;
pub mod validation;
pub mod workspace;

pub use error::{AgentError, Result};
