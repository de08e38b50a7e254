//! ViT image classifier backed by candle, with weights from the Hugging Face Hub

use async_trait::async_trait;
use candle_core::{DType, Device, Tensor, D};
use candle_nn::VarBuilder;
use candle_transformers::models::vit;
use hf_hub::api::sync::{ApiBuilder, ApiError};
use image::{imageops::FilterType, RgbImage};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task;
use tracing::info;

use super::{ClassifierEngine, EngineError, EngineLoader, Prediction};
use crate::config::ClassifierConfig;

const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// How many predictions the engine reports, matching the usual
/// image-classification pipeline output
const TOP_K: usize = 5;

/// The slice of a Hub `config.json` that carries the label mapping
#[derive(Debug, Deserialize)]
struct LabelMap {
    #[serde(default)]
    id2label: HashMap<String, String>,
}

/// A loaded ViT classification model
pub struct VitClassifier {
    model: vit::Model,
    labels: Vec<String>,
    device: Device,
    image_size: usize,
    model_id: String,
}

impl VitClassifier {
    /// Download (or reuse from cache) and build the model.
    ///
    /// Blocking; call from the blocking pool. Hub failures are classified
    /// structurally so credential, permission and rate-limit problems stay
    /// distinguishable downstream.
    pub fn load(
        config: &ClassifierConfig,
        token: Option<String>,
    ) -> std::result::Result<Self, EngineError> {
        let device = Device::cuda_if_available(0)
            .map_err(|e| EngineError::Load(format!("device selection failed: {}", e)))?;

        if token.is_some() {
            info!("Using Hugging Face authentication token");
        }
        info!(model = %config.model_id, cuda = device.is_cuda(), "Loading image classification model");

        let api = ApiBuilder::new()
            .with_token(token)
            .build()
            .map_err(classify_hub_error)?;
        let repo = api.model(config.model_id.clone());

        let config_path = repo.get("config.json").map_err(classify_hub_error)?;
        let weights_path = repo.get("model.safetensors").map_err(classify_hub_error)?;

        let raw_config = std::fs::read(&config_path)
            .map_err(|e| EngineError::Load(format!("failed to read model config: {}", e)))?;
        let vit_config: vit::Config = serde_json::from_slice(&raw_config)
            .map_err(|e| EngineError::Load(format!("unsupported model config: {}", e)))?;
        let labels = parse_labels(&raw_config)?;

        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, &device)
                .map_err(|e| EngineError::Load(format!("failed to map weights: {}", e)))?
        };
        let model = vit::Model::new(&vit_config, labels.len(), vb)
            .map_err(|e| EngineError::Load(format!("failed to build model: {}", e)))?;

        info!(model = %config.model_id, labels = labels.len(), "Image classification model loaded");

        Ok(Self {
            model,
            labels,
            device,
            image_size: vit_config.image_size,
            model_id: config.model_id.clone(),
        })
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Run one forward pass and return the top predictions, best first.
    ///
    /// Read-only; safe to call concurrently on a shared instance.
    pub fn classify(
        &self,
        image: &RgbImage,
    ) -> std::result::Result<Vec<Prediction>, EngineError> {
        let input = image_to_tensor(image, self.image_size, &self.device)
            .map_err(|e| EngineError::Inference(format!("preprocessing failed: {}", e)))?;

        let probabilities = (|| -> candle_core::Result<Vec<f32>> {
            let logits = self.model.forward(&input.unsqueeze(0)?)?;
            candle_nn::ops::softmax(&logits, D::Minus1)?
                .squeeze(0)?
                .to_vec1::<f32>()
        })()
        .map_err(|e| EngineError::Inference(e.to_string()))?;

        let mut indexed: Vec<(usize, f32)> = probabilities.into_iter().enumerate().collect();
        indexed.sort_by(|a, b| b.1.total_cmp(&a.1));

        Ok(indexed
            .into_iter()
            .take(TOP_K)
            .map(|(idx, score)| Prediction {
                label: label_at(&self.labels, idx),
                score,
            })
            .collect())
    }
}

/// Resize to the model's input resolution and apply ImageNet normalization,
/// producing a `(3, size, size)` tensor on the target device
fn image_to_tensor(
    image: &RgbImage,
    size: usize,
    device: &Device,
) -> candle_core::Result<Tensor> {
    let resized = image::imageops::resize(image, size as u32, size as u32, FilterType::Triangle);
    let data = resized.into_raw();

    let pixels = Tensor::from_vec(data, (size, size, 3), &Device::Cpu)?
        .permute((2, 0, 1))?
        .to_dtype(DType::F32)?
        .affine(1.0 / 255.0, 0.0)?;

    let mean = Tensor::new(&IMAGENET_MEAN, &Device::Cpu)?.reshape((3, 1, 1))?;
    let std = Tensor::new(&IMAGENET_STD, &Device::Cpu)?.reshape((3, 1, 1))?;
    pixels
        .broadcast_sub(&mean)?
        .broadcast_div(&std)?
        .to_device(device)
}

/// Build an index-ordered label table from the Hub config
fn parse_labels(raw_config: &[u8]) -> std::result::Result<Vec<String>, EngineError> {
    let map: LabelMap = serde_json::from_slice(raw_config)
        .map_err(|e| EngineError::Load(format!("unreadable label mapping: {}", e)))?;
    if map.id2label.is_empty() {
        return Err(EngineError::Load(
            "model config carries no id2label mapping".to_string(),
        ));
    }

    let mut labels = vec![String::new(); map.id2label.len()];
    for (key, label) in map.id2label {
        let idx: usize = key
            .parse()
            .map_err(|_| EngineError::Load(format!("non-numeric label id '{}'", key)))?;
        if idx < labels.len() {
            labels[idx] = label;
        }
    }
    Ok(labels)
}

fn label_at(labels: &[String], idx: usize) -> String {
    match labels.get(idx) {
        Some(label) if !label.is_empty() => label.clone(),
        _ => format!("LABEL_{}", idx),
    }
}

/// Map a Hub API failure onto the structured engine taxonomy.
///
/// 401, 403 and 429 carry a meaning the gateway must preserve; everything
/// else is an undifferentiated load failure.
fn classify_hub_error(err: ApiError) -> EngineError {
    fn status_kind(err: &ApiError) -> Option<EngineError> {
        match err {
            ApiError::RequestError(request) => match request.as_ref() {
                ureq::Error::Status(401, _) => Some(EngineError::Auth),
                ureq::Error::Status(403, _) => Some(EngineError::Forbidden),
                ureq::Error::Status(429, _) => Some(EngineError::RateLimited),
                _ => None,
            },
            ApiError::TooManyRetries(inner) => status_kind(inner),
            _ => None,
        }
    }

    status_kind(&err).unwrap_or_else(|| EngineError::Load(err.to_string()))
}

/// Production loader: builds a [`VitClassifier`] on the blocking pool
pub struct VitLoader {
    config: ClassifierConfig,
    token: Option<String>,
}

impl VitLoader {
    pub fn new(config: ClassifierConfig, token: Option<String>) -> Self {
        Self { config, token }
    }
}

#[async_trait]
impl EngineLoader for VitLoader {
    async fn load(&self) -> std::result::Result<Arc<dyn ClassifierEngine>, EngineError> {
        let config = self.config.clone();
        let token = self.token.clone();
        let classifier = task::spawn_blocking(move || VitClassifier::load(&config, token))
            .await
            .map_err(|e| EngineError::Load(format!("model load task failed: {}", e)))??;
        Ok(Arc::new(VitEngine {
            inner: Arc::new(classifier),
        }))
    }
}

/// Async adapter over the blocking classifier
struct VitEngine {
    inner: Arc<VitClassifier>,
}

#[async_trait]
impl ClassifierEngine for VitEngine {
    fn model_id(&self) -> &str {
        self.inner.model_id()
    }

    async fn classify(
        &self,
        image: RgbImage,
    ) -> std::result::Result<Vec<Prediction>, EngineError> {
        let inner = self.inner.clone();
        task::spawn_blocking(move || inner.classify(&image))
            .await
            .map_err(|e| EngineError::Inference(format!("classification task failed: {}", e)))?
    }
}
