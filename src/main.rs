//! Slasherz Server
//!
//! Serves the card catalog and the datapack sync protocol used by the
//! offline game clients.

use std::net::SocketAddr;

use anyhow::Context;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use slasherz_server::config::Config;
use slasherz_server::state::AppState;
use slasherz_server::storage::ImageStore;
use slasherz_server::{db, routes};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "slasherz_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();

    let config = Config::from_env().context("Failed to load configuration")?;

    tracing::info!("Starting Slasherz Server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Datapack directory: {}", config.datapack.dir.display());
    match &config.datapack.hasher_command {
        Some(command) => tracing::info!("Datapack hasher: {} (in-process fallback)", command),
        None => tracing::info!("Datapack hasher: in-process BLAKE2b"),
    }

    tokio::fs::create_dir_all(&config.datapack.dir)
        .await
        .with_context(|| format!("creating {}", config.datapack.dir.display()))?;

    // Initialize database
    let db_pool = db::create_pool(&config.database.url)
        .await
        .context("Failed to initialize database")?;
    tracing::info!("Database initialized at {}", config.database.url);

    // Initialize image storage
    let images = ImageStore::from_config(&config.storage)
        .await
        .context("Failed to initialize image storage")?;
    tracing::info!("Image backend: {:?}", config.storage.backend);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", config.server.host, config.server.port))?;

    let app_state = AppState::new(&config, db_pool, images);
    let app = routes::build_router(app_state);

    // Start server with graceful shutdown
    tracing::info!("Slasherz Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}
