//! Dispatch handlers for the two capability endpoints

use axum::extract::{Multipart, State};
use axum::Json;
use std::sync::Arc;
use tracing::{debug, error};

use crate::error::{AppError, Result};
use crate::gateway::types::{
    ImageAnalysisResponse, TextGenerationRequest, TextGenerationResponse,
};
use crate::gateway::validate::{require_image_content_type, resolve_model};
use crate::AppState;

/// Text generation flow: resolve defaults, call the remote backend once,
/// wrap the result. Backend failures arrive pre-classified from the client.
pub async fn generate_text(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TextGenerationRequest>,
) -> Result<Json<TextGenerationResponse>> {
    let model = resolve_model(request.model.as_deref(), state.ollama.default_model());

    debug!(model = %model, max_tokens = request.max_tokens, "Dispatching generation request");

    let text = state
        .ollama
        .generate(
            &request.prompt,
            &model,
            request.max_tokens,
            request.temperature,
        )
        .await
        .map_err(|e| {
            error!(error = %e, model = %model, "Text generation failed");
            e
        })?;

    Ok(Json(TextGenerationResponse { text, model }))
}

/// Image analysis flow: validate the upload, decode and normalize, then
/// classify via the lazily-created engine. The content-type check fails
/// before the classifier handle is touched.
pub async fn analyze_image(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<ImageAnalysisResponse>> {
    let (content_type, bytes) = read_upload(&mut multipart).await?;
    require_image_content_type(content_type.as_deref())?;

    let decoded = image::load_from_memory(&bytes)
        .map_err(|e| AppError::InvalidInput(format!("Could not decode image: {}", e)))?;
    let rgb = decoded.to_rgb8();

    let engine = state.classifier.get_or_init().await.map_err(|e| {
        error!(error = %e, "Classifier initialization failed");
        AppError::from(e)
    })?;

    let predictions = engine.classify(rgb).await.map_err(|e| {
        error!(error = %e, "Image classification failed");
        AppError::from(e)
    })?;

    Ok(Json(ImageAnalysisResponse {
        predictions,
        model: engine.model_id().to_string(),
    }))
}

/// Pull the uploaded file out of the multipart body
async fn read_upload(multipart: &mut Multipart) -> Result<(Option<String>, Vec<u8>)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Malformed multipart body: {}", e)))?
    {
        if field.name() == Some("file") {
            let content_type = field.content_type().map(str::to_string);
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::InvalidInput(format!("Could not read upload: {}", e)))?;
            return Ok((content_type, bytes.to_vec()));
        }
    }

    Err(AppError::InvalidInput(
        "Missing 'file' upload field".to_string(),
    ))
}
