//! HTTP client for llama-server's OpenAI-compatible API.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::LocalAIError;
use crate::DEFAULT_PORT;

/// Client for communicating with llama-server.
#[derive(Debug, Clone)]
pub struct LlamaCppClient {
    client: reqwest::Client,
    base_url: String,
}

/// Sampling options for a single completion call.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionOptions {
    /// Token budget for the completion.
    pub max_tokens: u32,
    /// Sampling temperature; `None` leaves the server default in place.
    pub temperature: Option<f32>,
    /// Sequences that end generation.
    pub stop: Vec<String>,
}

/// OpenAI-compatible text completion request.
#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    prompt: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    stop: &'a [String],
    stream: bool,
}

/// OpenAI-compatible text completion response.
#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    text: String,
    #[allow(dead_code)]
    finish_reason: Option<String>,
}

impl LlamaCppClient {
    /// Create a new client with default URL (localhost:11435).
    pub fn new() -> Self {
        Self::with_url(format!("http://127.0.0.1:{}", DEFAULT_PORT))
    }

    /// Create a new client with a custom URL.
    pub fn with_url(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Create a new client with a custom port on localhost.
    pub fn with_port(port: u16) -> Self {
        Self::with_url(format!("http://127.0.0.1:{}", port))
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check if the server is running and healthy.
    pub async fn check_health(&self) -> Result<(), LocalAIError> {
        let url = format!("{}/health", self.base_url);

        let response = self
            .client
            .get(&url)
            .timeout(std::time::Duration::from_secs(5))
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    LocalAIError::ServerNotRunning(self.base_url.clone())
                } else {
                    LocalAIError::Http(e)
                }
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(LocalAIError::ServerNotRunning(self.base_url.clone()))
        }
    }

    /// Send a text completion request to the server.
    ///
    /// Uses the OpenAI-compatible `/v1/completions` endpoint. Returns `None`
    /// when the server answers without any choices.
    pub async fn complete(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<Option<String>, LocalAIError> {
        let request = CompletionRequest {
            prompt,
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            stop: &options.stop,
            stream: false,
        };

        let url = format!("{}/v1/completions", self.base_url);
        debug!(
            "POST {} (max_tokens={}, temperature={:?})",
            url, options.max_tokens, options.temperature
        );

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    LocalAIError::ServerNotRunning(self.base_url.clone())
                } else {
                    LocalAIError::Http(e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(LocalAIError::Api(format!("{}: {}", status, text)));
        }

        let completion: CompletionResponse = response.json().await?;

        Ok(completion.choices.into_iter().next().map(|c| c.text))
    }
}

impl Default for LlamaCppClient {
    fn default() -> Self {
        Self::new()
    }
}
