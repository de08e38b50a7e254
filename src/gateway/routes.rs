//! Router assembly and service-level endpoints

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::gateway::handlers::{analyze_image, generate_text};
use crate::gateway::types::HealthResponse;
use crate::AppState;

/// Build the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/v1/generate/text", post(generate_text))
        .route("/api/v1/analyze/image", post(analyze_image))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Root endpoint with API information
async fn root() -> Json<Value> {
    Json(json!({
        "name": "ModelHub Gateway",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "health": "/health",
            "text_generation": "/api/v1/generate/text",
            "image_analysis": "/api/v1/analyze/image",
        },
    }))
}

/// Health check endpoint
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(state.health.check().await)
}
