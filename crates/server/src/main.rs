use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ticketline_core::{
    archive::ArchiveStore, create_authenticator, create_cache_store, create_message_source,
    create_notifier, load_config, validate_config, IngestLoop, PipelineSettings,
    SqliteArchiveStore, TicketPipeline,
};
use ticketline_server::{api::create_router, state::AppState};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

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
    let config_path = std::env::var("TICKETLINE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    // Short hash of the effective config, logged so deployments can be told apart
    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));

    info!(
        version = VERSION,
        config_hash = &config_hash[..16],
        "Configuration loaded successfully"
    );
    info!("Auth method: {:?}", config.auth.method);
    info!("Database path: {:?}", config.database.path);

    // Create authenticator
    let authenticator =
        create_authenticator(&config.auth).context("Failed to create authenticator")?;
    info!("Using authenticator: {}", authenticator.method_name());

    // Broker, cache, archive and notifier are created once and shared
    let source = create_message_source(&config.broker).context("Failed to create broker")?;
    info!("Using broker: {}", source.name());

    let cache = create_cache_store(&config.cache, &config.database.path)
        .context("Failed to create cache store")?;
    info!("Cache store initialized ({:?})", config.cache.backend);

    let archive: Arc<dyn ArchiveStore> = Arc::new(
        SqliteArchiveStore::new(&config.database.path)
            .context("Failed to create archive store")?,
    );
    info!("Archive store initialized");

    let notifier = create_notifier(&config.notifier).context("Failed to create notifier")?;
    info!(
        "Using notifier: {} ({} technicians)",
        notifier.name(),
        config.notifier.technicians.len()
    );

    let pipeline = Arc::new(TicketPipeline::new(
        source,
        cache,
        archive,
        notifier,
        PipelineSettings::from_config(&config),
    ));

    // Create ingest loop, started now if enabled
    let ingest = Arc::new(IngestLoop::new(
        Arc::clone(&pipeline),
        config.ingest.clone(),
    ));
    if config.ingest.enabled {
        ingest.start().await;
        info!("Ingest loop started");
    } else {
        info!("Ingest loop disabled in config");
    }

    // Create app state
    let state = Arc::new(AppState::new(
        config.clone(),
        authenticator,
        pipeline,
        Arc::clone(&ingest),
    ));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    // Let an in-progress drain stop pulling and finish its handlers
    info!("Server shutting down...");
    if ingest.stop().await {
        info!("Ingest loop stopped");
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
