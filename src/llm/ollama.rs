//! Ollama API client implementation
//!
//! This module implements the LlmClient trait for an Ollama-compatible server:
//! `GET /api/tags` as a connectivity probe and `POST /api/generate` for prompts.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::Client;

use crate::error::{AgentError, Result};
use crate::llm::client::{LlmClient, LlmError};
use crate::llm::types::{GenerateOptions, GenerateRequest, GenerateResponse, TagsResponse};

/// Default model to use
const DEFAULT_MODEL: &str = "llama3.1:latest";

/// Default base URL
const DEFAULT_BASE_URL: &str = "http://host.docker.internal:11434";

/// Hosts tried in order when discovering a reachable server
pub const DEFAULT_HOSTS: &[&str] = &[
    "http://host.docker.internal:11434",
    "http://localhost:11434",
    "http://0.0.0.0:11434",
    "http://172.17.0.1:11434",
];

/// Timeout for the startup probe
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for the Ollama client
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.7,
            max_tokens: 4096,
            timeout: Duration::from_secs(120),
        }
    }
}

impl OllamaConfig {
    /// Create a new config with a specific model
    pub fn with_model(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }
}

/// Ollama API client
pub struct OllamaClient {
    client: Client,
    config: OllamaConfig,
}

impl OllamaClient {
    /// Create a client without contacting the server
    pub fn new(config: OllamaConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AgentError::Connection(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Create a client and verify the server answers the probe
    pub async fn connect(config: OllamaConfig) -> Result<Self> {
        let client = Self::new(config)?;
        client.probe().await?;
        Ok(client)
    }

    /// Try each host in order and connect to the first that answers.
    ///
    /// `config.base_url` is ignored; every candidate is probed instead.
    pub async fn discover<S: AsRef<str>>(hosts: &[S], config: OllamaConfig) -> Result<Self> {
        let mut failures = Vec::new();
        for host in hosts {
            let candidate = OllamaConfig {
                base_url: host.as_ref().trim_end_matches('/').to_string(),
                ..config.clone()
            };
            match Self::connect(candidate).await {
                Ok(client) => return Ok(client),
                Err(e) => {
                    warn!("Host {} unreachable: {}", host.as_ref(), e);
                    failures.push(format!("{}: {}", host.as_ref(), e));
                }
            }
        }

        Err(AgentError::Connection(if failures.is_empty() {
            "no hosts configured".to_string()
        } else {
            failures.join("; ")
        }))
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Check that the server is reachable; fatal at startup
    pub async fn probe(&self) -> Result<TagsResponse> {
        let url = format!("{}/api/tags", self.config.base_url);
        let response = self
            .client
            .get(&url)
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
            .map_err(|e| AgentError::Connection(format!("Could not connect to {}: {}", self.config.base_url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AgentError::Connection(format!(
                "{} answered {} to the probe",
                self.config.base_url, status
            )));
        }

        let tags: TagsResponse = response.json().await.unwrap_or_default();
        info!(
            "Connected to {} ({} models available)",
            self.config.base_url,
            tags.models.len()
        );
        Ok(tags)
    }

    fn build_request(&self, prompt: &str) -> GenerateRequest {
        GenerateRequest::new(
            self.config.model.clone(),
            prompt,
            GenerateOptions {
                temperature: self.config.temperature,
                num_predict: self.config.max_tokens,
            },
        )
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn query(&self, prompt: &str) -> std::result::Result<String, LlmError> {
        let url = format!("{}/api/generate", self.config.base_url);
        debug!("Sending {} chars to {}", prompt.len(), url);

        let response = self.client.post(&url).json(&self.build_request(prompt)).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        let parsed: GenerateResponse = serde_json::from_str(&body)?;
        debug!("Got response of length: {}", parsed.response.len());
        Ok(parsed.response)
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}
