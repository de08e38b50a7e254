//! Health aggregation across the remote backend and the local model

use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::classifier::ClassifierHandle;
use crate::config::{HealthConfig, OllamaConfig};
use crate::error::{AppError, Result};
use crate::gateway::types::HealthResponse;

/// Probes the remote backend and reports the local model load state.
///
/// Runs out-of-band from dispatch: its own client, its own (short) timeout,
/// and no side effects on either backend.
pub struct HealthAggregator {
    client: Client,
    probe_url: String,
    classifier: Arc<ClassifierHandle>,
}

impl HealthAggregator {
    pub fn new(
        ollama: &OllamaConfig,
        health: &HealthConfig,
        classifier: Arc<ClassifierHandle>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(health.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            probe_url: format!("{}/api/tags", ollama.base_url.trim_end_matches('/')),
            classifier,
        })
    }

    /// One live probe per call, never cached. Timeout, transport failure and
    /// non-success status all read uniformly as "unavailable"; the cause is
    /// logged, not surfaced.
    pub async fn check(&self) -> HealthResponse {
        let ollama_available = match self.client.get(&self.probe_url).send().await {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                warn!(status = %response.status(), "Ollama health check returned failure status");
                false
            }
            Err(e) => {
                warn!(error = %e, "Ollama health check failed");
                false
            }
        };

        HealthResponse {
            status: if ollama_available {
                "healthy"
            } else {
                "degraded"
            }
            .to_string(),
            ollama_available,
            // Reads the handle state only; never triggers a load.
            image_model_loaded: self.classifier.is_loaded(),
        }
    }
}
