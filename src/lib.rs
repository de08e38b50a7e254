//! ModelHub Gateway
//!
//! A unified HTTP gateway exposing two AI capabilities through one API
//! surface: text generation delegated to a remote Ollama server, and image
//! classification executed in-process by a lazily-loaded candle ViT model.

pub mod backend;
pub mod classifier;
pub mod config;
pub mod error;
pub mod gateway;

pub use error::{AppError, Result};

use std::sync::Arc;

use backend::OllamaClient;
use classifier::{ClassifierHandle, VitLoader};
use gateway::health::HealthAggregator;

/// Application state shared across all handlers
pub struct AppState {
    pub settings: config::Settings,
    pub ollama: OllamaClient,
    pub classifier: Arc<ClassifierHandle>,
    pub health: HealthAggregator,
}

impl AppState {
    /// Wire up all collaborators from resolved settings.
    ///
    /// Settings are read once here and passed into constructors; nothing in
    /// the dispatch path performs ambient configuration lookups.
    pub fn new(settings: config::Settings) -> Result<Self> {
        let token = settings.resolve_hf_token();
        let ollama = OllamaClient::new(&settings.ollama)?;
        let classifier = Arc::new(ClassifierHandle::new(Box::new(VitLoader::new(
            settings.classifier.clone(),
            token,
        ))));
        let health = HealthAggregator::new(&settings.ollama, &settings.health, classifier.clone())?;

        Ok(Self {
            settings,
            ollama,
            classifier,
            health,
        })
    }
}
