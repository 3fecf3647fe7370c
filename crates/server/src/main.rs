use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use parcelwatch_core::{
    load_config, validate_config, ProcessorRegistry, ScheduledWorker, ShipmentStore,
    SqliteShipmentStore, TrackingWorker, WorkerScheduler,
};
use parcelwatch_server::{api::create_router, state::AppState};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("PARCELWATCH_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Database path: {:?}", config.database.path);

    // Create SQLite shipment store
    let store: Arc<dyn ShipmentStore> = Arc::new(
        SqliteShipmentStore::new(&config.database.path)
            .context("Failed to create shipment store")?,
    );
    info!("Shipment store initialized");

    // Carrier processors are built lazily on first use
    let registry = Arc::new(ProcessorRegistry::from_config(&config.carriers));
    info!(carriers = ?registry.carriers(), "Carrier processors registered");

    let worker = Arc::new(TrackingWorker::new(
        config.worker.clone(),
        Arc::clone(&store),
        Arc::clone(&registry),
    ));

    let mut scheduler = WorkerScheduler::new();
    if config.worker.enabled {
        scheduler
            .add(Arc::clone(&worker) as Arc<dyn ScheduledWorker>)
            .context("Failed to schedule tracking worker")?;
        scheduler.start();
    } else {
        info!("Tracking worker disabled in config");
    }

    // Create app state
    let state = Arc::new(AppState::new(config.clone(), store, registry, worker));

    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");
    if scheduler.is_running() {
        scheduler.stop();
    }

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
