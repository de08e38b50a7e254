//! Main entry point for the ModelHub Gateway

use modelhub_gateway::{config::Settings, gateway::routes::create_router, AppState};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Load configuration
    let settings = Settings::load()?;

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.logging.level.clone()));

    if settings.logging.format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
    }

    info!("Starting ModelHub Gateway");
    info!(
        host = %settings.server.host,
        port = settings.server.port,
        ollama = %settings.ollama.base_url,
        classifier = %settings.classifier.model_id,
        "Loaded configuration"
    );

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let state = Arc::new(AppState::new(settings)?);

    // Eager classifier load when configured. A failure here is not fatal:
    // the handle stays empty and the first analyze request retries.
    if !state.settings.classifier.lazy_load {
        match state.classifier.get_or_init().await {
            Ok(engine) => {
                info!(model = %engine.model_id(), "Image classifier loaded at startup")
            }
            Err(e) => {
                warn!(error = %e, "Eager classifier load failed; will retry on first request")
            }
        }
    }

    // Build the router
    let app = create_router(state);

    info!("Server listening on {}", addr);

    // Start the server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
