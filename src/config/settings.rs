//! Application settings and configuration management

use crate::error::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub server: ServerConfig,
    pub ollama: OllamaConfig,
    pub classifier: ClassifierConfig,
    pub health: HealthConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

/// Remote generation backend (Ollama) configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OllamaConfig {
    #[serde(default = "default_ollama_url")]
    pub base_url: String,
    #[serde(default = "default_text_model")]
    pub default_model: String,
    #[serde(default = "default_ollama_timeout")]
    pub timeout_secs: u64,
}

fn default_ollama_url() -> String {
    "http://ollama:11434".to_string()
}

fn default_text_model() -> String {
    "deepseek-r1:8b".to_string()
}

fn default_ollama_timeout() -> u64 {
    300
}

/// Local image classifier configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClassifierConfig {
    #[serde(default = "default_image_model")]
    pub model_id: String,
    /// Hugging Face access token; falls back to `token_file` when unset.
    #[serde(default)]
    pub hf_token: Option<String>,
    #[serde(default = "default_token_file")]
    pub token_file: String,
    #[serde(default = "default_true")]
    pub lazy_load: bool,
}

fn default_image_model() -> String {
    "google/vit-base-patch16-224".to_string()
}

fn default_token_file() -> String {
    "api_keys.txt".to_string()
}

fn default_true() -> bool {
    true
}

/// Health probe configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HealthConfig {
    #[serde(default = "default_health_timeout")]
    pub timeout_secs: u64,
}

fn default_health_timeout() -> u64 {
    5
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "plain".to_string()
}

impl Settings {
    /// Load settings from configuration files and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/default.toml")
    }

    /// Load settings from a specific configuration file path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            // Start with default values
            .set_default("server.host", default_host())?
            .set_default("server.port", 8000)?
            .set_default("ollama.base_url", default_ollama_url())?
            .set_default("ollama.default_model", default_text_model())?
            .set_default("ollama.timeout_secs", 300)?
            .set_default("classifier.model_id", default_image_model())?
            .set_default("classifier.token_file", default_token_file())?
            .set_default("classifier.lazy_load", true)?
            .set_default("health.timeout_secs", 5)?
            .set_default("logging.level", default_log_level())?
            .set_default("logging.format", default_log_format())?
            // Load from configuration file
            .add_source(
                File::with_name(path.as_ref().to_str().unwrap_or("config/default"))
                    .required(false),
            )
            // Override with environment variables (prefixed with MODELHUB_)
            .add_source(
                Environment::with_prefix("MODELHUB")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        Ok(settings)
    }

    /// Resolve the Hugging Face token: explicit config/env value first,
    /// then the first usable line of the key file, if it exists.
    pub fn resolve_hf_token(&self) -> Option<String> {
        if let Some(token) = &self.classifier.hf_token {
            if !token.trim().is_empty() {
                return Some(token.trim().to_string());
            }
        }

        match std::fs::read_to_string(&self.classifier.token_file) {
            Ok(contents) => contents
                .lines()
                .map(str::trim)
                .find(|line| !line.is_empty() && !line.starts_with('#'))
                .map(str::to_string),
            Err(e) => {
                debug!(
                    path = %self.classifier.token_file,
                    error = %e,
                    "No API key file found"
                );
                None
            }
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
            },
            ollama: OllamaConfig {
                base_url: default_ollama_url(),
                default_model: default_text_model(),
                timeout_secs: default_ollama_timeout(),
            },
            classifier: ClassifierConfig {
                model_id: default_image_model(),
                hf_token: None,
                token_file: default_token_file(),
                lazy_load: true,
            },
            health: HealthConfig {
                timeout_secs: default_health_timeout(),
            },
            logging: LoggingConfig {
                level: default_log_level(),
                format: default_log_format(),
            },
        }
    }
}
