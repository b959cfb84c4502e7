//! HTTP server setup

use std::future::Future;
use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::compression::CompressionLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::app::options::ServerOptions;
use crate::errors::SiteError;
use crate::server::handlers::{
    deploy_handler, generate_key_handler, health_handler, index_handler,
};
use crate::server::state::ServerState;

/// Build the router: API routes plus the output directory as web root
pub fn router(state: Arc<ServerState>) -> Router {
    let public_dir = state.deployer.layout().public_dir();
    let static_files = ServeDir::new(public_dir.path())
        .precompressed_gzip()
        .precompressed_br();
    let max_upload = state.max_upload_bytes;

    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        // Deployment
        .route(
            "/v1/deploy",
            post(deploy_handler).layer(DefaultBodyLimit::max(max_upload)),
        )
        .route("/v1/deploy/generate-key", post(generate_key_handler))
        // Everything else comes from the deployed site
        .fallback_service(static_files)
        // State and middleware
        .with_state(state)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
}

/// Start the HTTP server
pub async fn serve(
    options: &ServerOptions,
    state: Arc<ServerState>,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<JoinHandle<Result<(), SiteError>>, SiteError> {
    let app = router(state);

    let addr = format!("{}:{}", options.host, options.port);
    info!("Starting HTTP server on {}", addr);

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| SiteError::ServerError(format!("Failed to listen on {}: {}", addr, e)))?;

    let handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| SiteError::ServerError(e.to_string()))
    });

    Ok(handle)
}
