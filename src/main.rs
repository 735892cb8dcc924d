//! Alpha-link - Main Application
//!
//! Connects to a FANTM alpha sensor, then runs a tick-driven control loop that
//! reacts to the sensor's activation signal until Ctrl+C.

use alpha_link::alpha::{ActivationSignal, ConnectionSession};
use alpha_link::config::{Config, ConfigError, DEFAULT_CONFIG_PATH};
use alpha_link::control::{ActivationEdge, TickLoop};
use alpha_link::transport::BtleplugTransport;
use anyhow::{anyhow, Context, Result};
use log::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration before logging so the configured level applies
    let (config, missing_config) = match Config::load_default() {
        Ok(config) => (config, false),
        Err(ConfigError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => (Config::default(), true),
        Err(e) => return Err(e).with_context(|| format!("Failed to load {}", DEFAULT_CONFIG_PATH)),
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.logging.level.as_str()))
        .init();

    println!("=== Alpha-link ===");
    println!();
    println!("This application will:");
    println!("1. Scan for a '{}' sensor", config.bluetooth.device_name);
    println!("2. Subscribe to its '{}' telemetry", config.bluetooth.characteristic);
    println!("3. Run a {} Hz control loop driven by the activation signal", config.control_loop.tick_rate_hz);
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    if missing_config {
        warn!("{} not found, using built-in defaults", DEFAULT_CONFIG_PATH);
    } else {
        info!("✓ Loaded configuration from {}", DEFAULT_CONFIG_PATH);
    }

    let transport = BtleplugTransport::new()
        .await
        .context("Failed to open Bluetooth adapter")?;

    let mut session = ConnectionSession::new(transport)
        .with_scan_timeout(config.scan_timeout())
        .with_threshold(config.activation.threshold);

    let signal = ActivationSignal::new();
    let reader = signal.reader();

    // The control loop must not tick before the session is up
    let active = session
        .establish(&config.targets(), signal)
        .await
        .map_err(|e| anyhow!("Startup failed while {}: {}", e.stage(), e))?;
    info!("✓ Streaming from {}", active.device());

    let control_loop = TickLoop::new(reader, config.tick_interval())
        .spawn(|edge| match edge {
            ActivationEdge::Pressed => info!("▲ Activated"),
            ActivationEdge::Released => info!("▼ Released"),
        })
        .context("Failed to start control loop")?;

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;
    info!("Shutting down...");

    control_loop.stop();

    if let Err(e) = active.close().await {
        warn!("Error closing session: {}", e);
    }

    Ok(())
}
