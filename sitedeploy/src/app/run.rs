//! Main application run loop

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn};

use crate::analytics::client::AnalyticsClient;
use crate::app::options::AppOptions;
use crate::deploy::pipeline::Deployer;
use crate::errors::SiteError;
use crate::secret::store::SecretStore;
use crate::server::serve::serve;
use crate::server::state::ServerState;

/// Why the server stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Shutdown signal received
    Shutdown,
    /// A new deploy key was written and the process should be restarted
    Restart,
}

/// Run the server until a shutdown signal or a restart request
pub async fn run(
    options: AppOptions,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<RunOutcome, SiteError> {
    info!("Initializing site deployment server...");

    let (restart_tx, mut restart_rx) = mpsc::channel(1);
    let state = Arc::new(init_state(&options, restart_tx).await?);

    let (server_shutdown_tx, server_shutdown_rx) = oneshot::channel::<()>();
    let mut server_handle = serve(&options.server, state, async move {
        let _ = server_shutdown_rx.await;
    })
    .await?;

    let outcome = tokio::select! {
        _ = shutdown_signal => {
            info!("Shutdown signal received, shutting down...");
            RunOutcome::Shutdown
        }
        Some(()) = restart_rx.recv() => {
            info!("Restart requested, shutting down...");
            RunOutcome::Restart
        }
        result = &mut server_handle => {
            result.map_err(|e| SiteError::ServerError(e.to_string()))??;
            return Err(SiteError::ServerError("HTTP server stopped unexpectedly".to_string()));
        }
    };

    // Let in-flight requests finish, including the one that asked for the restart
    let _ = server_shutdown_tx.send(());
    match tokio::time::timeout(options.lifecycle.max_shutdown_delay, server_handle).await {
        Ok(joined) => joined.map_err(|e| SiteError::ServerError(e.to_string()))??,
        Err(_) => {
            error!(
                "Shutdown timed out after {:?}",
                options.lifecycle.max_shutdown_delay
            );
            return Err(SiteError::ServerError("shutdown timed out".to_string()));
        }
    }

    info!("Shutdown complete");
    Ok(outcome)
}

// =============================== INITIALIZATION ================================== //

async fn init_state(
    options: &AppOptions,
    restart_tx: mpsc::Sender<()>,
) -> Result<ServerState, SiteError> {
    let layout = options.layout.clone();
    info!("Serving site from {}", layout.root().display());

    let public_dir = layout.public_dir();
    if !public_dir.exists().await {
        public_dir.create().await?;
    }

    let secrets = Arc::new(SecretStore::from_env(layout.env_file()));
    if !secrets.is_configured().await {
        warn!("No DEPLOY_KEY configured, deployments are disabled until one is set or generated");
    }

    let analytics = Arc::new(AnalyticsClient::new(options.analytics.endpoint.clone())?);
    if !analytics.is_enabled() {
        info!("No analytics endpoint configured, events are disabled");
    }

    Ok(ServerState {
        secrets,
        deployer: Arc::new(Deployer::new(layout)),
        disc_space: Arc::from(options.deploy.disc_space.probe()),
        analytics,
        analytics_delay: options.analytics.deploy_delay,
        max_upload_bytes: options.deploy.max_upload_bytes,
        key_reload: options.deploy.key_reload,
        restart_tx,
    })
}
