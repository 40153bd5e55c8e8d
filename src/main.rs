//! Ingress edge.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client connection
//!     ────────────────▶ listener ─▶ sniffer ─▶ replayable stream
//!                                      │
//!                     ┌────────────────┴────────────────┐
//!                     ▼                                 ▼
//!               vhost proxy                        tcp forwarder
//!          (host lookup, basic auth)          (reject_http, splice)
//!                     │
//!          no route ──┴─▶ overload guard (503 page, then 403)
//!
//!     Cross-cutting: config + hot reload, admin API, logging, metrics
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::sync::mpsc;

use ingress_edge::config::watcher::ConfigWatcher;
use ingress_edge::config::{load_config, EdgeConfig};
use ingress_edge::lifecycle::{self, Shutdown};
use ingress_edge::observability::{logging, metrics};

#[derive(Parser, Debug)]
#[command(name = "ingress-edge", version, about = "Protocol-sniffing ingress proxy")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Unroutable requests per window answered with the 503 page before switching to 403
    #[arg(short = 'm', long)]
    max_service_unavailable_count: Option<u64>,
}

impl Args {
    fn apply_overrides(&self, config: &mut EdgeConfig) {
        if let Some(max) = self.max_service_unavailable_count {
            config.overload.max_service_unavailable_count = max;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => EdgeConfig::default(),
    };
    args.apply_overrides(&mut config);

    logging::init_logging(&config.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "ingress-edge starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_connections = config.listener.max_connections,
        routes = config.routes.len(),
        tcp_proxies = config.tcp_proxies.len(),
        max_service_unavailable_count = config.overload.max_service_unavailable_count,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // The CLI override wins over the file on every reload too.
    let (update_tx, update_rx) = mpsc::unbounded_channel();
    let _watcher = match &args.config {
        Some(path) => {
            let (watcher, mut reloads) = ConfigWatcher::new(path);
            let handle = watcher.run()?;
            let max = args.max_service_unavailable_count;
            tokio::spawn(async move {
                while let Some(mut reloaded) = reloads.recv().await {
                    if let Some(max) = max {
                        reloaded.overload.max_service_unavailable_count = max;
                    }
                    if update_tx.send(reloaded).is_err() {
                        break;
                    }
                }
            });
            Some(handle)
        }
        None => None,
    };

    let shutdown = Shutdown::new();
    let running = lifecycle::start(config, update_rx, &shutdown).await?;
    tracing::info!(
        http_address = %running.http_addr,
        admin_address = ?running.admin_addr,
        "Listening for connections"
    );

    shutdown.trigger_on_signal().await;
    running.wait().await;

    tracing::info!("Shutdown complete");
    Ok(())
}
