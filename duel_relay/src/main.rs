// CLI entry point for the duel relay.
//
// Starts a standalone relay server that browser clients connect to over
// WebSocket. See `server.rs` for the networking architecture and
// `session.rs` for the session rules.
//
// Usage:
//   relay [OPTIONS]
//     -c, --config <FILE>    TOML config file (missing file: defaults)
//     -l, --listen <ADDR>    Listen address (default: 127.0.0.1:8081)
//     -p, --path <PATH>      WebSocket path (default: /ws)
//     -d, --debug            Debug logging
//         --json-logs        JSON log lines

use anyhow::Context;
use clap::Parser;
use tracing::info;

use duel_relay::config::{Args, RelayConfig};
use duel_relay::logging::setup_logging;
use duel_relay::start_relay;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => RelayConfig::load(path)?,
        None => RelayConfig::default(),
    };
    config.apply_args(&args);

    setup_logging(&config.logging).context("failed to initialize logging")?;

    let ws_path = config.ws_path.clone();
    let (handle, addr) = start_relay(config)
        .await
        .context("failed to start relay")?;

    info!("Relay listening on ws://{addr}{ws_path}");
    info!("Press Ctrl+C to stop.");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl+C")?;

    info!("Shutting down...");
    handle.stop().await;
    Ok(())
}
