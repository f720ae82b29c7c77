// API Server Binary Entry Point
//
// Serves the prediction form and JSON API
// Usage: cargo run --features api --bin api_server

use math_score_predictor::{create_router, AppConfig, AppState};
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing (structured logging)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    // Default log level: info for our crate, warn for others
                    "math_score_predictor=info,tower_http=debug,axum=debug,warn".into()
                }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting API server...");

    // PORT, MODEL_PATH, CSV_FETCH_TIMEOUT_SECS
    let config = AppConfig::from_env();
    config.log();
    let port = config.port;

    // Model search runs once here; a missing model still lets the server start
    let state = tokio::task::spawn_blocking(move || AppState::new(config)).await?;

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
