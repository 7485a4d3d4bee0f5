use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use werewords::{broadcast, config::AppConfig, state::AppState};

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist, only log if it's a different issue
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "werewords=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Werewords...");

    let config = AppConfig::from_env();
    let bind = config.bind;

    let state = match AppState::from_config(config) {
        Ok(state) => Arc::new(state),
        Err(e) => {
            tracing::error!("Failed to open room store: {}", e);
            std::process::exit(1);
        }
    };

    // Bring back rooms from a previous run and resume their Day countdowns
    match state.registry.restore().await {
        Ok(rooms) => broadcast::resume_day_timers(&state, &rooms).await,
        Err(e) => tracing::warn!("Failed to restore rooms, starting empty: {}", e),
    }

    let app = werewords::router(state);

    tracing::info!("Listening on http://{}", bind);

    let listener = tokio::net::TcpListener::bind(bind).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
