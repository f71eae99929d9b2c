//! Clinic API guard server.
//!
//! # Architecture Overview
//!
//! ```text
//!  Client ──▶ request id / trace / timeout / body limit
//!               │
//!               ▼
//!          sanitize ─▶ csrf ─▶ authenticate ─▶ role gate ─▶ schema ─▶ rate limit ─▶ handler
//!                                  │                                                  │
//!                                  ▼                                                  ▼
//!                          identity provider                                   record store
//!                                  │                                                  │
//!                                  └──────────────▶ audit logger ◀────────────────────┘
//!                                                       ▲
//!                                         retention sweeper (timer)
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use clinic_guard::config::{load_config, GuardConfig};
use clinic_guard::lifecycle::{signals, startup, Shutdown};
use clinic_guard::observability::{logging, metrics};
use clinic_guard::HttpServer;

#[derive(Parser)]
#[command(name = "clinic-guard")]
#[command(about = "Validation and authorization gateway for the clinic API", long_about = None)]
struct Args {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => GuardConfig::default(),
    };

    logging::init(&config.observability)?;
    tracing::info!("clinic-guard v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.server.bind_address,
        store_backend = ?config.store.backend,
        request_timeout_secs = config.server.request_timeout_secs,
        retention_enabled = config.retention.enabled,
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

    let identity = startup::identity_provider(&config)?;
    let store = startup::record_store(&config)?;

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    tokio::spawn(signals::trigger_on_signal(shutdown.clone()));

    let server = HttpServer::new(config, identity, store)?;
    server.run(listener, &shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
