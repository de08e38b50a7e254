//! Request validation helpers

use crate::error::{AppError, Result};

const IMAGE_MEDIA_PREFIX: &str = "image/";

/// Reject uploads whose declared content-type is missing or not in the
/// image media family. Runs before any classifier access.
pub fn require_image_content_type(content_type: Option<&str>) -> Result<()> {
    match content_type {
        Some(ct) if ct.starts_with(IMAGE_MEDIA_PREFIX) => Ok(()),
        _ => Err(AppError::InvalidInput("File must be an image".to_string())),
    }
}

/// Pick the request's model identifier or fall back to the configured default
pub fn resolve_model(requested: Option<&str>, default_model: &str) -> String {
    match requested {
        Some(model) if !model.trim().is_empty() => model.to_string(),
        _ => default_model.to_string(),
    }
}
