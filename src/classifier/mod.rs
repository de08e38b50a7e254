//! Local image classification engine and its lazy process-wide handle

pub mod vit;

use async_trait::async_trait;
use image::RgbImage;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::OnceCell;

pub use vit::VitLoader;

/// Structured failure classification for the classification engine.
///
/// The gateway maps these to user-facing errors without inspecting any
/// error text; the engine adapter is responsible for producing the right
/// variant from whatever the underlying stack reports.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("model hub rejected the configured credential")]
    Auth,

    #[error("access to the model is forbidden")]
    Forbidden,

    #[error("model hub rate limit exceeded")]
    RateLimited,

    #[error("model load failed: {0}")]
    Load(String),

    #[error("classification failed: {0}")]
    Inference(String),
}

/// A single label prediction with its confidence score
#[derive(Debug, Clone, Serialize)]
pub struct Prediction {
    pub label: String,
    pub score: f32,
}

/// A loaded classification engine.
///
/// `classify` takes `&self` and performs no mutation; one engine instance
/// serves concurrent requests.
#[async_trait]
pub trait ClassifierEngine: Send + Sync {
    /// Identifier of the loaded model
    fn model_id(&self) -> &str;

    /// Classify a normalized RGB image, returning label/score pairs in the
    /// engine's own order
    async fn classify(&self, image: RgbImage) -> std::result::Result<Vec<Prediction>, EngineError>;
}

/// Constructs a classification engine on demand
#[async_trait]
pub trait EngineLoader: Send + Sync {
    async fn load(&self) -> std::result::Result<Arc<dyn ClassifierEngine>, EngineError>;
}

/// Process-wide, lazily-initialized handle to the classification engine.
///
/// The first caller triggers the load; concurrent first callers wait for
/// that single in-flight load. A failed load leaves the cell empty, so a
/// later call retries instead of observing a broken engine. Once set, the
/// engine lives for the rest of the process.
pub struct ClassifierHandle {
    loader: Box<dyn EngineLoader>,
    cell: OnceCell<Arc<dyn ClassifierEngine>>,
}

impl ClassifierHandle {
    pub fn new(loader: Box<dyn EngineLoader>) -> Self {
        Self {
            loader,
            cell: OnceCell::new(),
        }
    }

    /// Get the engine, loading it on first use
    pub async fn get_or_init(
        &self,
    ) -> std::result::Result<Arc<dyn ClassifierEngine>, EngineError> {
        self.cell
            .get_or_try_init(|| self.loader.load())
            .await
            .map(Arc::clone)
    }

    /// Whether the engine has been created. Never triggers a load.
    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }
}
