use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{Level, info, warn};
use tracing_subscriber::fmt::format::FmtSpan;

use pollbox::admission::VoteService;
use pollbox::api::{PollApiState, create_router};
use pollbox::config::PollConfig;
use pollbox::database::{DatabasePool, MemoryVoteStore, VoteStore};
use pollbox::intel::{IntelClient, PLACEHOLDER_API_KEY};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (needed for logging setup)
    let config = PollConfig::from_env().map_err(|e| {
        eprintln!("Configuration error: {}", e);
        e
    })?;

    init_logging(&config)?;

    info!("Starting Pollbox v{}", env!("CARGO_PKG_VERSION"));

    if config.intel.api_key == PLACEHOLDER_API_KEY {
        warn!("VPNAPI_KEY not set, using placeholder (lookups will be rejected remotely)");
    }

    // Vote storage: PostgreSQL when enabled, in-memory otherwise. A vote
    // collector that cannot persist must not start, so connection errors
    // here are fatal rather than a silent fallback.
    let store: Arc<dyn VoteStore> = if config.database.postgres_enabled {
        let database = DatabasePool::new(&config.database.url, config.database.max_connections)
            .await
            .map_err(|e| anyhow::anyhow!("Database connection failed: {}", e))?;
        database
            .init_schema()
            .await
            .map_err(|e| anyhow::anyhow!("Schema initialization failed: {}", e))?;
        Arc::new(database.votes().clone())
    } else {
        warn!("PostgreSQL disabled, votes will not survive a restart");
        Arc::new(MemoryVoteStore::new())
    };

    let intel = Arc::new(IntelClient::new(config.intel.clone())?);
    let service = Arc::new(VoteService::new(store, intel));

    let app = create_router(PollApiState { service }).layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Poll collector listening on {}", addr);
    info!("Intelligence service: {}", config.intel.service_url);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    info!("Shutdown complete");

    Ok(())
}

/// Initialize logging based on configuration
fn init_logging(config: &PollConfig) -> Result<()> {
    let log_level = match config.logging.level.as_str() {
        "error" => Level::ERROR,
        "warn" => Level::WARN,
        "info" => Level::INFO,
        "debug" => Level::DEBUG,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_span_events(if config.logging.log_requests {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        })
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    Ok(())
}

/// Resolves once the process receives ctrl-c or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
