//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (request ID, tracing, CORS, timeout, body limit)
//! - Assemble the upload store and processing adapter from config
//! - Serve on a listener until shutdown is signalled

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::ServiceConfig;
use crate::http::handlers::{health, index, remove_bg};
use crate::http::request::{make_request_span, propagate_request_id_layer, set_request_id_layer};
use crate::intake::{IdGenerator, UploadStore, UuidIds};
use crate::processing::{build_remover, BackgroundRemover, ProcessingAdapter};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<UploadStore>,
    pub adapter: Arc<ProcessingAdapter>,
    pub expose_error_details: bool,
}

/// HTTP server for the background removal API.
pub struct HttpServer {
    router: Router,
    config: ServiceConfig,
}

impl HttpServer {
    /// Create a server around the remover backend named in the config.
    pub fn new(config: ServiceConfig) -> io::Result<Self> {
        let remover_config = config.remover.clone();
        Self::assemble(config, Arc::new(UuidIds), move |store| {
            build_remover(&remover_config, store).map_err(io::Error::other)
        })
    }

    /// Create a server around an injected remover and id source.
    pub fn with_parts(
        config: ServiceConfig,
        remover: Arc<dyn BackgroundRemover>,
        ids: Arc<dyn IdGenerator>,
    ) -> io::Result<Self> {
        Self::assemble(config, ids, move |_| Ok(remover))
    }

    fn assemble<F>(
        config: ServiceConfig,
        ids: Arc<dyn IdGenerator>,
        make_remover: F,
    ) -> io::Result<Self>
    where
        F: FnOnce(Arc<UploadStore>) -> io::Result<Arc<dyn BackgroundRemover>>,
    {
        let store = Arc::new(UploadStore::new(config.storage.upload_dir.clone(), ids.clone())?);
        let remover = make_remover(store.clone())?;
        tracing::debug!(remover = %remover.name(), "Background remover ready");

        let adapter = ProcessingAdapter::new(remover, ids)
            .with_timeout(config.remover.timeout())
            .with_output_dir(config.storage.output_dir.clone());

        let state = AppState {
            store,
            adapter: Arc::new(adapter),
            expose_error_details: config.security.expose_error_details,
        };

        let router = Self::build_router(&config, state);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ServiceConfig, state: AppState) -> Router {
        Router::new()
            .route("/", get(index))
            .route("/health", get(health))
            .route("/remove-bg", post(remove_bg))
            .with_state(state)
            // Enforced inside the multipart stream so overflow surfaces as an `ApiError`.
            .layer(DefaultBodyLimit::max(config.security.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(CorsLayer::permissive())
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
            .layer(set_request_id_layer())
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upload_dir = %self.config.storage.upload_dir.display(),
            backend = ?self.config.remover.backend,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
