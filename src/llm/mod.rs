//! LLM Client Layer - reasoning-service integration
//!
//! This module provides:
//! - LlmClient trait for API abstraction
//! - OllamaClient implementation with startup probe and host discovery
//! - MockLlmClient with scripted replies
//! - Wire types for the generate API

pub mod client;
pub mod ollama;
pub mod types;

pub use client::{LlmClient, LlmError, MockLlmClient};
pub use ollama::{DEFAULT_HOSTS, OllamaClient, OllamaConfig};
pub use types::{GenerateOptions, GenerateRequest, GenerateResponse, TagsResponse};
