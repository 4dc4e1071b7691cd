//! Runner module - drives sessions to a terminal status.
//!
//! This module provides:
//! - IterationController, one controller for both action domains
//! - FeedbackBuilder for the text carried into the next prompt

mod controller;
pub mod feedback;

pub use controller::{CodeStage, ControllerConfig, DEFAULT_ACTION_TIMEOUT, IterationController};
pub use feedback::FeedbackBuilder;
