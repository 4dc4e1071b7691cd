//! Wire types for the Ollama-compatible generate API

use serde::{Deserialize, Serialize};

/// Body of `POST /api/generate`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub stream: bool,
    pub options: GenerateOptions,
}

/// Sampling options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateOptions {
    pub temperature: f32,
    /// Maximum tokens to generate
    pub num_predict: u32,
}

impl GenerateRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>, options: GenerateOptions) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            stream: false,
            options,
        }
    }
}

/// Body returned by `POST /api/generate` with `stream: false`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub model: Option<String>,
    pub response: String,
    #[serde(default)]
    pub done: bool,
}

/// Body returned by `GET /api/tags`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TagsResponse {
    #[serde(default)]
    pub models: Vec<ModelTag>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelTag {
    pub name: String,
}
