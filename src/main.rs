//! Secure WebSocket streaming client.
//!
//! # Architecture Overview
//!
//! ```text
//!   ┌──────────────────────────────── SESSION ─────────────────────────────────┐
//!   │                                                                           │
//!   │  ┌──────────┐   ┌───────────┐   ┌─────────┐   ┌──────────┐   ┌─────────┐  │
//!   │  │ resolver │──▶│ transport │──▶│   tls   │──▶│ upgrade  │──▶│  read   │  │
//!   │  │          │   │  (tcp)    │   │ (rustls)│   │  (ws)    │   │  loop   │  │
//!   │  └──────────┘   └───────────┘   └─────────┘   └──────────┘   └────┬────┘  │
//!   │   ◀──────── 30s deadline per stage ───────▶    stream profile     │       │
//!   │                                                                   ▼       │
//!   │                                                      "<n> bytes received" │
//!   │  ┌────────────────────────────────────────────────────────────────────┐   │
//!   │  │  config · observability · resilience · lifecycle (shutdown/signals) │   │
//!   │  └────────────────────────────────────────────────────────────────────┘   │
//!   └───────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Exit Status
//! - 0: the stream was closed cleanly
//! - 1: configuration or trust store setup failed, or the session failed

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use stream_client::config::{load_config, ClientConfig};
use stream_client::lifecycle::startup::{build_session, Overrides};
use stream_client::lifecycle::{signals, Shutdown};
use stream_client::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "stream-client")]
#[command(about = "Stream messages from a secure WebSocket endpoint", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Remote host (overrides target.host)
    #[arg(long)]
    host: Option<String>,

    /// Remote port or service name (overrides target.port)
    #[arg(long)]
    port: Option<String>,

    /// Resource path (overrides target.path)
    #[arg(long)]
    path: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match cli.config.as_deref().map(load_config).transpose() {
        Ok(config) => config.unwrap_or_default(),
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    Overrides { host: cli.host, port: cli.port, path: cli.path }.apply(&mut config);

    logging::init(&config.observability);
    tracing::info!("stream-client v{} starting", env!("CARGO_PKG_VERSION"));

    let config = match config.validated() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        }
    }

    run(config).await
}

async fn run(config: ClientConfig) -> ExitCode {
    let shutdown = Shutdown::new();
    let mut session = match build_session(&config, &shutdown) {
        Ok(session) => session,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    tokio::spawn(signals::listen(shutdown));

    match session.start(&config.target.host, &config.target.port).await {
        Ok(()) => {
            let buffered = session.take_buffer().map_or(0, |buffer| buffer.len());
            tracing::info!(buffered, "Stream closed");
            ExitCode::SUCCESS
        }
        Err(_) => ExitCode::FAILURE,
    }
}
