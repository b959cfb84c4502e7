//! Server state

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::analytics::client::AnalyticsClient;
use crate::deploy::disc_space::DiscSpaceProbe;
use crate::deploy::pipeline::Deployer;
use crate::secret::store::{KeyReloadPolicy, SecretStore};

/// Server state shared across handlers
pub struct ServerState {
    pub secrets: Arc<SecretStore>,
    pub deployer: Arc<Deployer>,
    pub disc_space: Arc<dyn DiscSpaceProbe>,
    pub analytics: Arc<AnalyticsClient>,
    pub analytics_delay: Duration,
    pub max_upload_bytes: usize,
    pub key_reload: KeyReloadPolicy,
    /// Asks the run loop to shut down so a supervisor restarts the process
    pub restart_tx: mpsc::Sender<()>,
}

impl ServerState {
    /// Ask for a restart. Only the first request matters.
    pub fn request_restart(&self) {
        let _ = self.restart_tx.try_send(());
    }
}
