use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use engagement::analytics::SystemClock;
use engagement::api::{self, AppState};
use engagement::config::Config;
use engagement::storage;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!("Loaded configuration");

    // Initialize storage
    let storage = storage::connect(&config.database).await?;
    info!("Initializing database...");
    storage.init().await?;
    info!("Database initialized successfully");

    if config.cors.allowed_origins.is_empty() {
        info!("🌐 CORS: allowing any origin");
    } else {
        info!("🌐 CORS: allowing {}", config.cors.allowed_origins.join(", "));
    }

    let state = Arc::new(AppState {
        storage,
        clock: Arc::new(SystemClock),
        analytics: config.analytics.clone(),
    });
    let router = api::create_api_router(state, &config.cors);

    let addr = format!("{}:{}", config.api_server.host, config.api_server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("🚀 Engagement service listening on http://{}", addr);
    info!("   - Health check at http://{}/api/engagement-logs/health", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Engagement service stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
