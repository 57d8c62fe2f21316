use std::sync::Arc;

use tracing_subscriber::EnvFilter;

mod api;
mod config;
mod error;
mod tts;

use api::routes::{create_router, AppState};
use config::GatewayConfig;
use tts::{PiperEngine, TtsService};

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match GatewayConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };
    let addr = config.addr();

    tracing::info!("Synthesis gateway v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Voices directory: {}", config.voices_dir.display());
    tracing::info!("Default character: {}", config.default_character);

    let engine = Arc::new(PiperEngine::new(config.voices_dir));
    let tts = TtsService::new(engine, config.default_character);

    if let Err(e) = tts.warm_up() {
        tracing::error!(
            character = tts.default_character(),
            "Failed to load default character: {}",
            e
        );
        std::process::exit(1);
    }

    let state = Arc::new(AppState { tts });
    let app = create_router(state);

    tracing::info!("Starting server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .await
        .expect("Server error");
}
