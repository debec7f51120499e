//! roundsync - live round synchronization engine.

use anyhow::Result;
use clap::Parser;
use roundsync_core::Symbol;
use roundsync_engine::{AppConfig, Engine};
use roundsync_telemetry::Metrics;
use tracing::{debug, info, warn};

/// Live round synchronization engine
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via ROUNDSYNC_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,

    /// Symbol to subscribe to, overriding the config file
    #[arg(short, long)]
    symbol: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Must run before any TLS connection
    roundsync_ws::init_crypto();

    let args = Args::parse();

    roundsync_telemetry::init_logging()?;

    info!("Starting roundsync v{}", env!("CARGO_PKG_VERSION"));

    let mut config = AppConfig::load(args.config.as_deref())?;
    if let Some(symbol) = args.symbol {
        config.symbol = Symbol::new(symbol);
    }
    info!(
        symbol = %config.symbol,
        ws_url = %config.ws_url,
        api_url = %config.api_url,
        "Configuration loaded"
    );

    let (engine, handle) = Engine::new(config);
    let mut engine_task = tokio::spawn(engine.run());

    let mut views = handle.subscribe();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                handle.shutdown();
                break;
            }

            changed = views.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = views.borrow_and_update().clone();
                debug!(
                    state = %view.connection.state,
                    offline = view.offline,
                    lifecycle = ?view.lifecycle,
                    round = ?view.round.as_ref().map(|r| r.id.0),
                    price = ?view.round.as_ref().map(|r| r.current_price.to_string()),
                    remaining = ?view.round.as_ref().map(|r| r.remaining_seconds),
                    "View updated"
                );
            }

            result = &mut engine_task => {
                warn!(?result, "Engine exited");
                return Ok(result??);
            }
        }
    }

    engine_task.await??;

    match Metrics::render() {
        Ok(text) => debug!(metrics = %text, "Final metrics"),
        Err(e) => warn!(error = %e, "Failed to render metrics"),
    }

    Ok(())
}
