//! KnowAir Service - telemetry ingestion, alert classification and HTTP API.
//!
//! Run with: `cargo run -p knowair-service`

use std::net::SocketAddr;
use std::path::PathBuf;

use axum::Router;
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use knowair_core::AlertMode;
use knowair_service::{AppState, Config, api, ws};
use knowair_store::Store;

/// KnowAir Service - air-quality ingestion and alerting API.
#[derive(Parser, Debug)]
#[command(name = "knowair-service")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bind address (overrides config).
    #[arg(short, long)]
    bind: Option<String>,

    /// Database path (overrides config).
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Alert classifier: `trend` or `range` (overrides config).
    #[arg(short, long)]
    mode: Option<AlertMode>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("knowair_service=info".parse()?)
                .add_directive("tower_http=debug".parse()?),
        )
        .init();

    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };

    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if let Some(db_path) = args.database {
        config.storage.path = db_path;
    }
    if let Some(mode) = args.mode {
        config.alerts.mode = mode;
    }
    config.validate()?;

    info!("Opening database at {:?}", config.storage.path);
    let store = Store::open(&config.storage.path)?;

    info!(mode = %config.alerts.mode, "Alert classifier ready");
    let addr: SocketAddr = config.server.bind.parse()?;
    let state = AppState::new(store, config);

    #[cfg(feature = "mqtt")]
    knowair_service::mqtt::MqttSubscriber::new(std::sync::Arc::clone(&state))
        .start()
        .await;

    let app = Router::new()
        .merge(api::router())
        .merge(ws::router())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
