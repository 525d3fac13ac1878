//! ZakatGo chain gateway.
//!
//! ```text
//! HTTP client / zakatgo-cli
//!     → http (axum router, API key, request ids)
//!     → ChainTransactionGateway (session, lists, count)
//!     → LocalWalletProvider + ledger contract → JSON-RPC node
//!     → LocalStore (last-known transaction count)
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use zakatgo_gateway::config::{load_config, GatewayConfig};
use zakatgo_gateway::gateway::spawn_event_listener;
use zakatgo_gateway::http::HttpServer;
use zakatgo_gateway::lifecycle::signals::spawn_signal_handler;
use zakatgo_gateway::lifecycle::startup::load_contract_abi;
use zakatgo_gateway::lifecycle::{assemble, Shutdown};
use zakatgo_gateway::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "zakatgo-gateway", version, about = "Chain transaction gateway for ZakatGo")]
struct Args {
    /// Path to the TOML config file. Defaults apply when omitted.
    #[arg(short, long, env = "ZAKATGO_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "zakatgo-gateway starting");
    if let Some(path) = &args.config {
        tracing::info!(path = %path.display(), "Configuration loaded");
    }

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let abi = load_contract_abi(&config)?;
    let runtime = assemble(&config, abi).await?;
    runtime.gateway.initialize().await;

    let shutdown = Arc::new(Shutdown::new());
    spawn_signal_handler(shutdown.clone());

    let listener_task = spawn_event_listener(runtime.gateway.clone(), shutdown.subscribe());
    let watcher_task = runtime.wallet.clone().map(|wallet| {
        let every = std::time::Duration::from_secs(config.blockchain.chain_poll_interval_secs);
        tokio::spawn(wallet.watch_chain(every, shutdown.subscribe()))
    });

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(runtime.gateway.clone(), &config.server);
    server.run(listener, shutdown.subscribe()).await?;

    for task in [listener_task, watcher_task].into_iter().flatten() {
        let _ = task.await;
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
