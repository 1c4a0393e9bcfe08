use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ticketgate_core::{
    create_authenticator, load_config, validate_config, AdmissionService, Authenticator,
    CacheBackend, CacheConfig, CounterStore, MemoryCounterStore, QuotaLedger, RedisCounterStore,
    SqliteRegistry, TokenIssuer,
};
use ticketgate_server::{api::create_router, state::AppState};

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
    let config_path = std::env::var("TICKETGATE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    // Fingerprint of the effective config, handy when comparing replicas
    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));

    info!(config_hash = &config_hash[..16], "Configuration loaded successfully");
    info!("Auth method: {:?}", config.auth.method);
    info!("Database path: {:?}", config.database.path);

    // Create authenticator
    let authenticator: Arc<dyn Authenticator> = Arc::from(
        create_authenticator(&config.auth).context("Failed to create authenticator")?,
    );
    info!("Using authenticator: {}", authenticator.method_name());

    // Create SQLite registry (tickets and registrants)
    let registry = Arc::new(
        SqliteRegistry::new(&config.database.path).context("Failed to open registry database")?,
    );
    info!("Registry initialized");

    // Create counter store shared by the quota ledger and the token issuer
    let counter_store = create_counter_store(&config.cache).await?;
    info!("Counter store initialized: {}", counter_store.name());

    let admission = AdmissionService::new(
        registry.clone(),
        registry,
        QuotaLedger::new(Arc::clone(&counter_store), config.admission.quota_ttl()),
        TokenIssuer::new(counter_store, config.admission.token_length),
        &config.admission,
    );

    // Create app state
    let state = Arc::new(AppState::new(config.clone(), authenticator, admission));

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

    info!("Server stopped");
    Ok(())
}

async fn create_counter_store(config: &CacheConfig) -> Result<Arc<dyn CounterStore>> {
    match config.backend {
        CacheBackend::Memory => {
            info!("Using in-process counter store (single node only)");
            Ok(Arc::new(MemoryCounterStore::new()))
        }
        CacheBackend::Redis => {
            let url = config
                .url
                .as_deref()
                .context("cache.url must be set for the redis backend")?;
            let store = RedisCounterStore::new(url, config.prefix.clone(), config.timeout())
                .await
                .context("Failed to connect to Redis")?;
            Ok(Arc::new(store))
        }
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
