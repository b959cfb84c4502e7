//! Deployment secret store
//!
//! Owns the configured deployment secret, the `.env` file it is persisted
//! to, and the guard that keeps key generation single-flight. Constructed
//! once at startup and shared with the handlers through the server state.

use std::sync::atomic::{AtomicBool, Ordering};

use secrecy::{ExposeSecret, SecretString};
use subtle::ConstantTimeEq;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use crate::errors::SiteError;
use crate::filesys::file::File;
use crate::secret::words;
use crate::storage::env_file::{find_deploy_key, set_deploy_key, DEPLOY_KEY_VAR};

pub const NO_KEY_CONFIGURED: &str =
    "No Deploy Key set! Add a DEPLOY_KEY to the .env file or call POST /v1/deploy/generate-key";
pub const INVALID_KEY: &str = "Invalid or missing Deploy Key";
pub const GENERATION_BUSY: &str = "Invalid request.";
pub const KEY_EXISTS: &str = "Invalid request. Key already exists.";
pub const ENV_FILE_MISSING: &str = ".env file does not exist";

/// Lifecycle of the deployment secret
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretState {
    /// No secret configured and none generated yet
    Absent,
    /// Written to the `.env` file, effective after the process restarts
    WrittenPendingRestart,
    /// Compared against incoming deploy requests
    Active,
}

/// How a freshly generated secret takes effect
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KeyReloadPolicy {
    /// Exit so a supervisor restarts the process with the new environment
    #[default]
    Restart,
    /// Activate the secret in memory without restarting
    InMemory,
}

impl std::str::FromStr for KeyReloadPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "restart" => Ok(KeyReloadPolicy::Restart),
            "in-memory" | "in_memory" | "memory" => Ok(KeyReloadPolicy::InMemory),
            _ => Err(format!("Invalid key reload policy: {}", s)),
        }
    }
}

pub struct SecretStore {
    active: RwLock<Option<SecretString>>,
    pending_restart: AtomicBool,
    env_file: File,
    generating: Mutex<()>,
}

impl SecretStore {
    /// Create a store. Empty secrets count as not configured.
    pub fn new(secret: Option<String>, env_file: File) -> Self {
        let active = secret
            .filter(|s| !s.is_empty())
            .map(SecretString::from);
        Self {
            active: RwLock::new(active),
            pending_restart: AtomicBool::new(false),
            env_file,
            generating: Mutex::new(()),
        }
    }

    /// Create a store from the `DEPLOY_KEY` environment variable
    pub fn from_env(env_file: File) -> Self {
        Self::new(std::env::var(DEPLOY_KEY_VAR).ok(), env_file)
    }

    pub fn env_file(&self) -> &File {
        &self.env_file
    }

    pub async fn is_configured(&self) -> bool {
        self.active.read().await.is_some()
    }

    pub async fn state(&self) -> SecretState {
        if self.is_configured().await {
            SecretState::Active
        } else if self.pending_restart.load(Ordering::SeqCst) {
            SecretState::WrittenPendingRestart
        } else {
            SecretState::Absent
        }
    }

    /// Check a secret supplied by a client
    pub async fn verify(&self, supplied: Option<&str>) -> Result<(), SiteError> {
        let active = self.active.read().await;
        let Some(expected) = active.as_ref() else {
            return Err(SiteError::ConfigError(NO_KEY_CONFIGURED.to_string()));
        };

        let matches: bool = supplied
            .map(|s| s.as_bytes().ct_eq(expected.expose_secret().as_bytes()).into())
            .unwrap_or(false);

        if matches {
            Ok(())
        } else {
            Err(SiteError::AuthError(INVALID_KEY.to_string()))
        }
    }

    /// Generate, persist and return a new secret.
    ///
    /// Rejects immediately when another generation is in flight, or when a
    /// secret exists either in memory or in the `.env` file.
    pub async fn generate(&self, policy: KeyReloadPolicy) -> Result<String, SiteError> {
        let _guard = self
            .generating
            .try_lock()
            .map_err(|_| SiteError::Rejected(GENERATION_BUSY.to_string()))?;

        if self.is_configured().await {
            return Err(SiteError::Rejected(KEY_EXISTS.to_string()));
        }

        if !self.env_file.exists().await {
            return Err(SiteError::ConfigError(ENV_FILE_MISSING.to_string()));
        }

        // The file may hold a key the running process has not loaded yet
        let contents = self.env_file.read_string().await?;
        if find_deploy_key(&contents).is_some() {
            warn!("Refusing to generate a deploy key: .env already has one");
            return Err(SiteError::Rejected(KEY_EXISTS.to_string()));
        }

        let secret = words::generate();
        let updated = set_deploy_key(&contents, &secret);
        self.env_file.write_atomic(updated.as_bytes()).await?;
        info!("Generated new deploy key in {}", self.env_file.path().display());

        match policy {
            KeyReloadPolicy::Restart => {
                self.pending_restart.store(true, Ordering::SeqCst);
            }
            KeyReloadPolicy::InMemory => {
                *self.active.write().await = Some(SecretString::from(secret.clone()));
            }
        }

        Ok(secret)
    }
}
