//! API request and response types

use serde::{Deserialize, Serialize};

use crate::classifier::Prediction;

fn default_max_tokens() -> u32 {
    512
}

fn default_temperature() -> f32 {
    0.7
}

/// Request body for text generation
#[derive(Debug, Clone, Deserialize)]
pub struct TextGenerationRequest {
    /// The text prompt for generation
    pub prompt: String,

    /// The Ollama model to use; the configured default applies when unset
    #[serde(default)]
    pub model: Option<String>,

    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Accepted for compatibility; dispatch is always non-streaming
    #[serde(default)]
    pub stream: bool,
}

/// Response body for text generation
#[derive(Debug, Clone, Serialize)]
pub struct TextGenerationResponse {
    /// Generated text (may be empty)
    pub text: String,

    /// Model actually used for generation
    pub model: String,
}

/// Response body for image analysis
#[derive(Debug, Clone, Serialize)]
pub struct ImageAnalysisResponse {
    /// Label predictions in the engine's order, untouched by the gateway
    pub predictions: Vec<Prediction>,

    /// Model used for analysis
    pub model: String,
}

/// Response body for the health endpoint
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub ollama_available: bool,
    pub image_model_loaded: bool,
}
