//! CORS proxy (v1)
//!
//! Forwards `{endpoint}?destination=<url>` requests to `<url>`, adds
//! permissive CORS headers to the answer, and rewrites HLS / WebVTT
//! manifests so every referenced resource is fetched through the proxy too.
//!
//! ```text
//!     Browser ──▶ listener ──▶ http server ──▶ proxy::Forwarder ──▶ Destination
//!        ▲                                              │
//!        │                                              ▼
//!        └──── CORS headers ◀── passthrough | proxy::PlaylistRewriter
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use cors_proxy::config::{load_config, ProxyConfig};
use cors_proxy::lifecycle::{self, Shutdown};
use cors_proxy::observability::logging;

#[derive(Parser)]
#[command(name = "cors-proxy", version)]
#[command(about = "Edge CORS proxy with HLS playlist rewriting", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long, env = "CORS_PROXY_CONFIG")]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,

    /// Override `observability.log_level`.
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => match load_config(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => ProxyConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }
    if let Some(level) = cli.log_level {
        config.observability.log_level = level;
    }

    logging::init(&config.observability);

    tracing::info!("cors-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        endpoint = %config.proxy.endpoint,
        max_concurrent_requests = config.listener.max_concurrent_requests,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    let shutdown = Shutdown::new();
    shutdown.trigger_on_signal();

    match lifecycle::start(config, &shutdown).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Fatal error");
            ExitCode::FAILURE
        }
    }
}
