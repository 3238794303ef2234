//! Startup orchestration.
//!
//! # Responsibilities
//! - Resolve configuration (file, environment, validation)
//! - Initialize logging and metrics
//! - Bind the listener last, so traffic only arrives when ready
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal

use std::path::Path;

use tokio::net::TcpListener;

use crate::config::{resolve_config, ServiceConfig};
use crate::http::HttpServer;
use crate::lifecycle::Shutdown;
use crate::observability::{logging, metrics};

/// Run the service until a shutdown signal arrives.
pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = resolve_config(config_path)?;
    logging::init(&config.observability);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "bg-remove-api starting");
    log_config(&config);

    if config.observability.metrics_enabled {
        if let Some(addr) = config.observability.metrics_socket_addr() {
            metrics::init_metrics(addr);
        }
    }

    let bind_address = config.listener.bind_address();
    let server = HttpServer::new(config)?;

    let listener = TcpListener::bind(&bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let _signals = shutdown.trigger_on_signal();

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn log_config(config: &ServiceConfig) {
    tracing::info!(
        bind_address = %config.listener.bind_address(),
        upload_dir = %config.storage.upload_dir.display(),
        output_dir = ?config.storage.output_dir,
        remover_backend = ?config.remover.backend,
        remover = %config.remover.program,
        remover_timeout_secs = config.remover.timeout_secs,
        request_timeout_secs = config.timeouts.request_secs,
        max_body_size = config.security.max_body_size,
        "Configuration loaded"
    );
}
