//! medscribe-server: clinical documentation assistant binary entrypoint.

use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use medscribe_server::ai::{CredentialResolver, ExtractionGateway};
use medscribe_server::config::Config;
use medscribe_server::state::{AppState, gemini_factory};
use medscribe_server::store::{HistoryStore, JsonFileStore};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let config = Config::from_env();

    // Load persisted history
    let store = JsonFileStore::in_dir(&config.data_dir);
    let history = store
        .load()
        .await
        .expect("Failed to read consultation history");
    tracing::info!(
        path = %store.path().display(),
        entries = history.len(),
        "Consultation history loaded"
    );

    let factory = gemini_factory(&config.ai);
    let gateway = ExtractionGateway::from_resolver(&CredentialResolver::default(), &factory);
    let state = AppState::new(gateway, factory, Arc::new(store), history, &config);

    if config.recording_enabled {
        tracing::info!("Audio recording enabled");
    } else {
        tracing::warn!("Audio recording disabled (MEDSCRIBE_RECORDING_ENABLED=false)");
    }
    tracing::info!(model = %config.ai.model, "Generative model");
    tracing::info!("Rate limiting: {} requests/second", config.rate_limit_rps);

    let app = medscribe_server::build_app(state, &config);

    let addr: SocketAddr = config.bind_address.parse().expect("Invalid bind address");
    tracing::info!("Starting MedScribe server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    tracing::info!("Server shutdown complete");
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
