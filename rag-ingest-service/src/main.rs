use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{info, warn};

mod api;
mod chunking;
mod config;
mod db;
mod error;
mod ingestion;
mod naming;
mod service;
mod signal;
mod store;
mod validation;

use crate::config::load_config;
use crate::db::Database;
use crate::service::DataService;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    init_logging();

    info!(
        "Starting rag-ingest service v{}",
        env!("CARGO_PKG_VERSION")
    );

    let config = Arc::new(load_config()?);

    info!(
        host = %config.server.host,
        port = config.server.port,
        data_dir = %config.storage.data_dir.display(),
        "Configuration loaded"
    );

    // Ensure storage directories exist
    std::fs::create_dir_all(config.storage.files_dir())?;

    // Initialize database
    let db_path = config.storage.database_path();
    let db = Arc::new(Database::open(&db_path)?);
    info!(path = %db_path.display(), "Database initialized");

    let service = Arc::new(DataService::new(config.clone(), db.clone()));
    let app = api::router(service.clone());

    // Start the server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The router is gone; release the last handles and close the database.
    drop(service);
    match Arc::try_unwrap(db) {
        Ok(db) => {
            db.close()?;
            info!("Database closed");
        }
        Err(_) => warn!("Database still referenced at shutdown, skipping close"),
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

fn init_logging() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let format = fmt::format()
        .with_target(true)
        .with_thread_ids(true)
        .compact();

    // Use RUST_LOG if set, otherwise default to info level for our crate
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("rag_ingest_service=info"));

    tracing_subscriber::registry()
        .with(fmt::layer().event_format(format))
        .with(filter)
        .init();
}
