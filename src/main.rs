//! CAIRIS Daemon
//!
//! Serves the CAIRIS REST API over a SQLite model store.
//!
//! ## Usage
//!
//! ```bash
//! # Start with defaults
//! cairisd
//!
//! # Start with custom config
//! cairisd --config /path/to/config.toml
//!
//! # Custom port, verbose logging
//! cairisd --port 7072 --log-level verbose
//!
//! # Throwaway in-memory databases, one per session
//! cairisd --in-memory
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use cairis::{Config, HttpServer, LogLevel, SessionRegistry};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "cairisd")]
#[command(about = "CAIRIS security model store and REST API")]
struct Args {
    /// Path to config file
    #[arg(short, long, env = "CAIRIS_CONFIG")]
    config: Option<PathBuf>,

    /// Storage directory
    #[arg(long, env = "CAIRIS_STORAGE_DIR")]
    storage_dir: Option<PathBuf>,

    /// HTTP port; 0 keeps the configured port
    #[arg(short, long, env = "CAIRIS_PORT")]
    port: Option<u16>,

    /// Log level: verbose, debug or warning
    #[arg(long, env = "CAIRIS_LOG_LEVEL")]
    log_level: Option<String>,

    /// Give every session a private in-memory database
    #[arg(long)]
    in_memory: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load config
    let mut config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => Config::default(),
    };

    // Apply CLI overrides
    if let Some(dir) = args.storage_dir {
        config.storage_dir = dir;
    }
    if let Some(port) = args.port {
        config.set_port(port);
    }
    if let Some(level) = &args.log_level {
        config.log_level = LogLevel::parse(level);
    }
    if args.in_memory {
        config.in_memory = true;
    }

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(config.log_level.directive().parse()?))
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "Starting cairisd");
    config.log_params();

    if !config.in_memory {
        // Ensure storage directory exists
        tokio::fs::create_dir_all(&config.storage_dir)
            .await
            .with_context(|| format!("failed to create {}", config.storage_dir.display()))?;

        // Save default config if it doesn't exist
        let config_path = config.config_path();
        if !config_path.exists() {
            config.save(&config_path)?;
            info!(path = %config_path.display(), "Created default config");
        }
    }

    let registry = Arc::new(SessionRegistry::from_config(&config));

    let http_addr: SocketAddr = config
        .bind_addr()
        .parse()
        .with_context(|| format!("invalid bind address {}", config.bind_addr()))?;
    let http_server = Arc::new(HttpServer::new(Arc::clone(&registry), http_addr));

    info!("REST API available at http://{}/api", http_addr);
    info!("Press Ctrl+C to stop.");

    // Handle shutdown signal
    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
        info!("Shutting down...");
    };

    tokio::select! {
        result = http_server.run() => {
            if let Err(e) = result {
                error!(error = %e, "HTTP server error");
            }
        }
        _ = shutdown => {}
    }

    info!(sessions = registry.len(), "Closing open sessions");
    Ok(())
}
