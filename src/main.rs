use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bluffroom::{config::GameConfig, llm, state::AppState, store::MemoryStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
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
                .unwrap_or_else(|_| "bluffroom=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting bluffroom...");

    let config = GameConfig::from_env();
    tracing::info!(
        "Scoring: correct={} fooled={} bonus={} (threshold {})",
        config.scoring.correct_guess_points,
        config.scoring.fooling_points,
        config.scoring.most_fooled_bonus,
        config.scoring.most_fooled_threshold
    );

    // Question generation degrades to the built-in bank when unconfigured
    let questions = llm::LlmConfig::from_env().build_source();

    let addr = config.bind_addr;
    let state = Arc::new(AppState::new(
        Arc::new(MemoryStore::new()),
        questions,
        config,
    ));

    let app = bluffroom::app(state);

    tracing::info!("Listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
