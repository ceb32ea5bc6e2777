//! Webhook forwarding gateway.
//!
//! Receives webhook calls under configured path prefixes, forwards them to a
//! single automation upstream and relays the buffered answer back with CORS
//! headers applied.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────────────┐
//!                     │                  WEBHOOK GATEWAY                     │
//!                     │                                                      │
//!  Client Request     │  ┌─────────┐    ┌──────────┐    ┌───────────────┐   │
//!  ───────────────────┼─▶│  http   │───▶│ routing  │───▶│    proxy      │   │
//!                     │  │ server  │    │ prefix + │    │ headers, body │   │
//!                     │  └─────────┘    │ rewrite  │    │ buffering     │   │
//!                     │       ▲         └──────────┘    └───────┬───────┘   │
//!                     │       │                                 │           │
//!  Client Response    │  ┌────┴─────┐                   ┌───────▼───────┐   │
//!  ◀──────────────────┼──│ response │◀──────────────────│   upstream    │◀──┼── Upstream
//!                     │  │ relay /  │                   │ client (pool, │   │
//!                     │  │ 502/504  │                   │  deadline)    │   │
//!                     │  └──────────┘                   └───────────────┘   │
//!                     │                                                      │
//!                     │  config · observability · resilience · lifecycle     │
//!                     └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use webhook_gateway::config::load_config;
use webhook_gateway::observability::{logging, metrics};
use webhook_gateway::{GatewayServer, Shutdown};

#[derive(Parser)]
#[command(name = "webhook-gateway")]
#[command(about = "Buffered forwarding gateway for automation webhooks", long_about = None)]
struct Cli {
    /// TOML configuration file; built-in defaults when omitted.
    #[arg(short, long, env = "GATEWAY_CONFIG")]
    config: Option<PathBuf>,

    /// Validate the configuration and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;

    if cli.check {
        println!("configuration OK: {} route(s) → {}", config.routes.len(), config.upstream.origin);
        return Ok(());
    }

    logging::init_logging(&config.observability)?;

    tracing::info!("webhook-gateway v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.origin,
        request_timeout_secs = config.timeouts.request_secs,
        max_body_bytes = config.limits.max_body_bytes,
        "Configuration loaded"
    );
    for route in &config.routes {
        tracing::info!(route = %route.name, prefix = %route.prefix, rewrite = ?route.rewrite, "Route configured");
    }

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics endpoint");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let bind_address = config.listener.bind_address.clone();
    let server = GatewayServer::new(config)?;

    // Bind last: traffic only once everything above is ready
    let listener = TcpListener::bind(&bind_address).await?;

    let shutdown = Shutdown::new();
    shutdown.trigger_on_signal();
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
