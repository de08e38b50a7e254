//! HTTP client for the remote Ollama generation backend

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::config::OllamaConfig;
use crate::error::{AppError, Result};

/// Client for the Ollama generation API.
///
/// Holds no per-call state; a single instance is shared across requests and
/// every call is one attempt bounded by the client-level timeout.
pub struct OllamaClient {
    client: Client,
    base_url: String,
    default_model: String,
}

/// Request body for `/api/generate`
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    num_predict: u32,
    temperature: f32,
}

/// Response body from `/api/generate`; only the text field matters here.
/// A missing field is an empty generation, not an error.
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

impl OllamaClient {
    /// Create a new client from configuration
    pub fn new(config: &OllamaConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            default_model: config.default_model.clone(),
        })
    }

    /// The configured default text model
    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    /// Generate text for a prompt.
    ///
    /// One attempt, non-streaming. Timeouts, transport failures and non-2xx
    /// upstream statuses each map to their own `AppError` variant; retry
    /// policy is the caller's business.
    pub async fn generate(
        &self,
        prompt: &str,
        model: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);
        let body = GenerateRequest {
            model,
            prompt,
            stream: false,
            options: GenerateOptions {
                num_predict: max_tokens,
                temperature,
            },
        };

        debug!(model = %model, url = %url, "Sending generate request");

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::BackendTimeout
                } else {
                    AppError::BackendUnreachable(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AppError::BackendError {
                status: status.as_u16(),
                detail,
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to parse Ollama response: {}", e)))?;

        Ok(parsed.response)
    }
}
