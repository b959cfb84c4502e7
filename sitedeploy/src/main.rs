//! sitedeploy - Entry Point
//!
//! Serves a static site and accepts zip deployments on `/v1/deploy`.
//! Expects to run under a supervisor that restarts it after a deploy key
//! has been generated.

use std::collections::HashMap;
use std::env;

use sitedeploy::app::options::AppOptions;
use sitedeploy::app::run::{run, RunOutcome};
use sitedeploy::logs::init_logging;
use sitedeploy::storage::layout::SiteLayout;
use sitedeploy::utils::version_info;

use tracing::{debug, error, info, warn};

/// Parse `--key=value` and `--flag` arguments
fn parse_args(args: impl Iterator<Item = String>) -> HashMap<String, String> {
    let mut cli_args = HashMap::new();
    for arg in args {
        if let Some((key, value)) = arg.split_once('=') {
            cli_args.insert(key.trim_start_matches('-').to_string(), value.to_string());
        } else if arg.starts_with("--") {
            cli_args.insert(arg.trim_start_matches('-').to_string(), "true".to_string());
        }
    }
    cli_args
}

#[tokio::main]
async fn main() {
    let cli_args = parse_args(env::args().skip(1));

    // Print version and exit
    if cli_args.contains_key("version") {
        match serde_json::to_string_pretty(&version_info()) {
            Ok(version) => println!("{}", version),
            Err(e) => eprintln!("Failed to render version: {}", e),
        }
        return;
    }

    // Load the site's .env before reading options; real environment values win
    let site_root = cli_args
        .get("site-root")
        .cloned()
        .or_else(|| env::var("SITE_ROOT").ok())
        .unwrap_or_else(|| ".".to_string());
    let env_file = SiteLayout::new(site_root).env_file();
    let dotenv_result = dotenvy::from_path(env_file.path());

    let options = match AppOptions::load(&cli_args) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let log_guard = match init_logging(options.logs.clone()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            None
        }
    };

    match dotenv_result {
        Ok(()) => info!("Loaded {}", env_file.path().display()),
        Err(e) if e.not_found() => debug!("No {} to load", env_file.path().display()),
        Err(e) => warn!("Failed to load {}: {}", env_file.path().display(), e),
    }

    info!("Running sitedeploy with options: {:?}", options);
    let code = match run(options, await_shutdown_signal()).await {
        Ok(RunOutcome::Shutdown) => 0,
        Ok(RunOutcome::Restart) => {
            info!("Exiting so the supervisor restarts with the new deploy key");
            0
        }
        Err(e) => {
            error!("Failed to run the server: {}", e);
            1
        }
    };

    // Flush file logs before exiting
    drop(log_guard);
    std::process::exit(code);
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = sigterm.recv() => {
                        info!("SIGTERM received, shutting down...");
                    }
                    _ = tokio::signal::ctrl_c() => {
                        info!("Ctrl+C received, shutting down...");
                    }
                }
                return;
            }
            Err(e) => warn!("Cannot listen for SIGTERM: {}", e),
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Cannot listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Ctrl+C received, shutting down...");
}
