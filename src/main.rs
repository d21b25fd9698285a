//! confgate server.
//!
//! # Architecture Overview
//!
//! ```text
//!                       ┌──────────────────────────────────────────────┐
//!   API request         │  ┌────────┐    ┌──────────────┐              │
//!   ────────────────────┼─▶│  http  │───▶│   service    │              │
//!                       │  │ server │    │ reconcile /  │              │
//!                       │  └────────┘    │ edit/publish │              │
//!                       │                └──┬────────┬──┘              │
//!                       │                   │        │                 │
//!                       │                   ▼        ▼                 │
//!                       │            ┌─────────┐ ┌──────┐              │
//!                       │            │ storage │ │  kv  │──────────────┼──▶ etcd
//!                       │            │ (tx)    │ │client│              │
//!                       │            └─────────┘ └──────┘              │
//!                       │  ┌─────────────────────────────────────────┐ │
//!                       │  │ config (+watcher) · observability ·     │ │
//!                       │  │ lifecycle (signals, shutdown)           │ │
//!                       │  └─────────────────────────────────────────┘ │
//!                       └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use arc_swap::ArcSwap;
use clap::Parser;
use tokio::net::TcpListener;

use confgate::config::watcher::ConfigWatcher;
use confgate::config::{load_config, AppConfig};
use confgate::lifecycle::{signals, startup, Shutdown};
use confgate::observability::{logging, metrics};
use confgate::HttpServer;

#[derive(Parser)]
#[command(name = "confgate")]
#[command(about = "Configuration distribution service", long_about = None)]
struct Args {
    /// Path to the TOML config file. Defaults apply when omitted.
    #[arg(short, long, env = "CONFGATE_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "confgate starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        kv_backend = ?config.kv.backend,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let live = Arc::new(ArcSwap::from_pointee(config.clone()));
    let service = Arc::new(startup::build_service(live.clone())?);

    // Hot reload: keep the watcher handle alive for the whole run.
    let _watcher = match &args.config {
        Some(path) => {
            let (watcher, mut updates) = ConfigWatcher::new(path, &config);
            let handle = watcher.run()?;
            let live = live.clone();
            tokio::spawn(async move {
                while let Some(new_config) = updates.recv().await {
                    tracing::info!(
                        key_prefix = %new_config.kv.key_prefix,
                        environments = new_config.kv.environments.len(),
                        "Configuration reloaded"
                    );
                    live.store(Arc::new(new_config));
                }
            });
            Some(handle)
        }
        None => None,
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    signals::spawn_signal_listener(&shutdown);

    let server = HttpServer::new(&config, service);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
