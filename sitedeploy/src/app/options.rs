//! Application configuration options
//!
//! Options are read from environment variables (after the site's `.env`
//! file has been loaded) and can be overridden with `--key=value`
//! command-line arguments.

use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::deploy::disc_space::DiscSpaceBackend;
use crate::errors::SiteError;
use crate::logs::{LogFormat, LogLevel, LogOptions};
use crate::secret::store::KeyReloadPolicy;
use crate::storage::layout::SiteLayout;

/// Main application options
#[derive(Debug, Clone, Default)]
pub struct AppOptions {
    /// Lifecycle configuration
    pub lifecycle: LifecycleOptions,

    /// Server configuration
    pub server: ServerOptions,

    /// Site directories
    pub layout: SiteLayout,

    /// Deployment endpoint options
    pub deploy: DeployOptions,

    /// Analytics options
    pub analytics: AnalyticsOptions,

    /// Logging options
    pub logs: LogOptions,
}

/// Lifecycle options
#[derive(Debug, Clone)]
pub struct LifecycleOptions {
    /// Maximum delay for graceful shutdown
    pub max_shutdown_delay: Duration,
}

impl Default for LifecycleOptions {
    fn default() -> Self {
        Self {
            max_shutdown_delay: Duration::from_secs(30),
        }
    }
}

/// HTTP server options
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3010,
        }
    }
}

/// Deployment endpoint options
#[derive(Debug, Clone)]
pub struct DeployOptions {
    /// Largest accepted upload
    pub max_upload_bytes: usize,

    /// How free disc space is measured
    pub disc_space: DiscSpaceBackend,

    /// How a generated key takes effect
    pub key_reload: KeyReloadPolicy,
}

impl Default for DeployOptions {
    fn default() -> Self {
        Self {
            max_upload_bytes: 512 * 1024 * 1024,
            disc_space: DiscSpaceBackend::Df,
            key_reload: KeyReloadPolicy::Restart,
        }
    }
}

/// Analytics options
#[derive(Debug, Clone)]
pub struct AnalyticsOptions {
    /// Collector endpoint; events are dropped when unset
    pub endpoint: Option<Url>,

    /// Delay between a successful deployment and its event
    pub deploy_delay: Duration,
}

impl Default for AnalyticsOptions {
    fn default() -> Self {
        Self {
            endpoint: None,
            deploy_delay: Duration::from_secs(5),
        }
    }
}

/// Environment variable and command-line name of each option
const OPTIONS: &[(&str, &str)] = &[
    ("HOST", "host"),
    ("PORT", "port"),
    ("SITE_ROOT", "site-root"),
    ("DEPLOY_PLACEHOLDER", "placeholder"),
    ("DEPLOY_MAX_UPLOAD_MB", "max-upload-mb"),
    ("DISC_SPACE_PROBE", "disc-space-probe"),
    ("KEY_RELOAD", "key-reload"),
    ("ANALYTICS_URL", "analytics-url"),
    ("ANALYTICS_DELAY_SECS", "analytics-delay-secs"),
    ("LOG_LEVEL", "log-level"),
    ("LOG_FORMAT", "log-format"),
    ("LOG_DIR", "log-dir"),
];

fn parse<T>(name: &str, value: &str) -> Result<T, SiteError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| SiteError::ConfigError(format!("Invalid value for {}: {}", name, e)))
}

impl AppOptions {
    /// Read options from the process environment and command-line arguments
    pub fn load(cli_args: &HashMap<String, String>) -> Result<Self, SiteError> {
        Self::from_lookup(|env_name| std::env::var(env_name).ok(), cli_args)
    }

    /// Read options from `lookup` (environment) with `cli_args` taking precedence
    pub fn from_lookup<L>(lookup: L, cli_args: &HashMap<String, String>) -> Result<Self, SiteError>
    where
        L: Fn(&str) -> Option<String>,
    {
        let values: HashMap<&str, String> = OPTIONS
            .iter()
            .filter_map(|&(env_name, cli_name)| {
                cli_args
                    .get(cli_name)
                    .cloned()
                    .or_else(|| lookup(env_name))
                    .filter(|v| !v.trim().is_empty())
                    .map(|v| (env_name, v))
            })
            .collect();
        let get = |name: &str| values.get(name).map(String::as_str);

        let mut options = AppOptions::default();

        if let Some(host) = get("HOST") {
            options.server.host = host.trim().to_string();
        }
        if let Some(port) = get("PORT") {
            options.server.port = parse("PORT", port)?;
        }

        if let Some(root) = get("SITE_ROOT") {
            options.layout = SiteLayout::new(PathBuf::from(root.trim()));
        }
        if let Some(placeholder) = get("DEPLOY_PLACEHOLDER") {
            options.layout = options.layout.with_placeholder(placeholder.trim());
        }

        if let Some(mb) = get("DEPLOY_MAX_UPLOAD_MB") {
            let mb: usize = parse("DEPLOY_MAX_UPLOAD_MB", mb)?;
            options.deploy.max_upload_bytes = mb.saturating_mul(1024 * 1024);
        }
        if let Some(probe) = get("DISC_SPACE_PROBE") {
            options.deploy.disc_space = parse("DISC_SPACE_PROBE", probe)?;
        }
        if let Some(policy) = get("KEY_RELOAD") {
            options.deploy.key_reload = parse("KEY_RELOAD", policy)?;
        }

        if let Some(url) = get("ANALYTICS_URL") {
            options.analytics.endpoint = Some(parse("ANALYTICS_URL", url)?);
        }
        if let Some(secs) = get("ANALYTICS_DELAY_SECS") {
            options.analytics.deploy_delay =
                Duration::from_secs(parse("ANALYTICS_DELAY_SECS", secs)?);
        }

        if let Some(level) = get("LOG_LEVEL") {
            options.logs.log_level = parse::<LogLevel>("LOG_LEVEL", level)?;
        }
        if let Some(format) = get("LOG_FORMAT") {
            options.logs.format = parse::<LogFormat>("LOG_FORMAT", format)?;
        }
        if let Some(dir) = get("LOG_DIR") {
            options.logs.log_dir = Some(PathBuf::from(dir.trim()));
        }

        Ok(options)
    }
}
