//! # AMR Relay - Application Entry Point
//!
//! Streams an AMR file that an encoder is writing to a UDP receiver.
//!
//! ## What happens at startup:
//! 1. **Environment**: `.env` is loaded if present
//! 2. **Logging**: `tracing` subscriber filtered by `RUST_LOG`
//! 3. **Configuration**: defaults, `amr-relay.toml`, `AMR_RELAY_*` variables
//! 4. **Session**: one streaming session over the configured source file
//!
//! The process exits when the source ends (non-follow mode) or on
//! SIGINT/SIGTERM, after printing the session report as JSON.

use amr_relay::source::FileConnector;
use amr_relay::{RelayConfig, StreamingController};
use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    init_tracing()?;

    let config = RelayConfig::load().context("failed to load configuration")?;
    config.validate()?;

    info!("Starting amr-relay v{}", env!("CARGO_PKG_VERSION"));
    info!(
        source = %config.source.path.display(),
        follow = config.source.follow,
        "Destination {}:{}",
        config.destination.host,
        config.destination.port
    );

    let connector = FileConnector::new(config.source.path.clone(), config.source.follow);
    let mut controller = StreamingController::new(connector, config);
    controller.start().await?;

    // `wait()` is cancel-safe, so losing the race to a signal leaves the
    // worker in place for `stop()` to join.
    let finished = tokio::select! {
        report = controller.wait() => report,
        _ = shutdown_signal() => None,
    };

    let report = match finished {
        Some(report) => Some(report),
        None => controller.stop().await,
    };

    match report {
        Some(report) => println!("{}", serde_json::to_string(&report)?),
        None => warn!("Session ended without a report"),
    }

    info!("Relay stopped");
    Ok(())
}

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` controls the filter; without it the relay logs at debug level.
fn init_tracing() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "amr_relay=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .context("failed to initialize logging")?;

    Ok(())
}

/// Resolve on SIGINT or SIGTERM.
#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let (mut sigterm, mut sigint) = match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
        _ => {
            warn!("Failed to install signal handlers, falling back to Ctrl+C");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => info!("Received SIGTERM"),
        _ = sigint.recv() => info!("Received SIGINT"),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Received Ctrl+C");
}
