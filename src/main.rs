//! AROI data proxy.
//!
//! # Architecture Overview
//!
//! ```text
//! Client ──▶ http::server ──▶ routing (sanitize, classify)
//!                                  │
//!                  ┌───────────────┴───────────────┐
//!                  ▼                               ▼
//!           proxy::assets                   proxy::resolver
//!           (asset host)                    ├─▶ cache (edge cache)
//!                                           └─▶ storage (do, r2 in order)
//!
//! Cross-cutting: config, lifecycle, observability, resilience
//! ```

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use aroi_proxy::config::{load_config, watcher::ConfigWatcher};
use aroi_proxy::http::HttpServer;
use aroi_proxy::lifecycle::{signals::trigger_on_signal, Shutdown};
use aroi_proxy::observability::{logging::init_logging, metrics::init_metrics};

#[derive(Parser)]
#[command(name = "aroi-proxy")]
#[command(about = "Read-only proxy for AROI manifests and archives", long_about = None)]
struct Cli {
    /// TOML configuration file. Environment variables override it.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Reload the configuration file when it changes.
    #[arg(short, long, requires = "config")]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    init_logging(&config.observability.log_level);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address,
        storage_order = %config.storage.order,
        "aroi-proxy starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;

    // The notify watcher stops when dropped; keep it for the whole run.
    let (_watcher, config_updates) = match cli.config.as_deref().filter(|_| cli.watch) {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (Some(watcher.run()?), updates)
        }
        None => {
            let (_, updates) = mpsc::unbounded_channel();
            (None, updates)
        }
    };

    let shutdown = Shutdown::new();
    tokio::spawn(trigger_on_signal(shutdown.clone()));

    let server = HttpServer::new(config);
    server.run(listener, config_updates, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
