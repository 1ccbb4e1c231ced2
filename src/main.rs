//! http-plug demo service.
//!
//! Hosts the request adapter behind axum:
//!
//! ```text
//!     Client ──▶ request id ─▶ trace ─▶ timeout ─▶ CORS ─▶ body limit
//!                                                            │
//!                                                            ▼
//!     Client ◀── JSON envelope ◀── handler ◀── RequestAdapter::plug
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use http_plug::config::{load_config, validate_config, ConfigError, ServiceConfig};
use http_plug::lifecycle::{terminate_signal, Shutdown};
use http_plug::observability::{logging, metrics};
use http_plug::HttpServer;

#[derive(Debug, Parser)]
#[command(name = "http-plug", version, about = "Demo service for the request adapter")]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => ServiceConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
        validate_config(&config).map_err(ConfigError::Validation)?;
    }

    logging::init(&config.observability)?;

    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_body_bytes = config.limits.max_body_bytes,
        multipart_max_memory = config.limits.multipart_max_memory,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config).run(listener, shutdown.subscribe());
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => result?,
        _ = terminate_signal() => {
            shutdown.trigger();
            server.await?;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
