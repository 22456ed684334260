//! Zenoh bridge for Sungrow inverters.
//!
//! Polls Sungrow inverters over Modbus and publishes their readings to Zenoh.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use sungrow_modbus::ModelRegistry;
use tracing::{error, info};
use zenoh_bridge_sungrow::config::SungrowBridgeConfig;
use zenoh_bridge_sungrow::poller::DevicePoller;
use zenoh_bridge_sungrow::{logging, session};

/// Zenoh bridge for Sungrow inverters (Modbus TCP/RTU).
#[derive(Parser, Debug)]
#[command(name = "zenoh-bridge-sungrow")]
#[command(about = "Polls Sungrow inverters and publishes to Zenoh")]
#[command(version)]
struct Args {
    /// Path to configuration file (JSON5 format)
    #[arg(short, long, default_value = "sungrow.json5")]
    config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = SungrowBridgeConfig::load_from_file(&args.config)
        .with_context(|| format!("Failed to load config from {:?}", args.config))?;

    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    logging::init_tracing(&config.logging)?;

    info!("Starting zenoh-bridge-sungrow");
    info!("Loaded configuration from {:?}", args.config);

    let registry = Arc::new(ModelRegistry::builtin().context("Invalid built-in register maps")?);
    info!(models = registry.len(), "Loaded inverter models");

    let session = Arc::new(session::connect(&config.zenoh).await?);

    let mut tasks = Vec::new();
    for device in &config.sungrow.devices {
        let poller = DevicePoller::new(
            device.clone(),
            registry.clone(),
            session.clone(),
            config.sungrow.key_prefix.clone(),
            config.sungrow.serialization,
        );

        tasks.push(tokio::spawn(poller.run()));
    }

    info!(
        "Sungrow bridge running with {} device(s)",
        config.sungrow.devices.len()
    );

    let status_key = format!("{}/@/status", config.sungrow.key_prefix);
    let status = serde_json::json!({
        "bridge": "sungrow",
        "version": env!("CARGO_PKG_VERSION"),
        "devices": config.sungrow.devices.iter().map(|d| &d.name).collect::<Vec<_>>(),
        "status": "running"
    });

    if let Err(e) = session.put(&status_key, status.to_string()).await {
        error!("Failed to publish bridge status: {}", e);
    }

    tokio::signal::ctrl_c().await?;
    info!("Received shutdown signal");

    for task in tasks {
        task.abort();
    }

    let status = serde_json::json!({
        "bridge": "sungrow",
        "status": "offline"
    });
    if let Err(e) = session.put(&status_key, status.to_string()).await {
        error!("Failed to publish bridge status: {}", e);
    }

    session
        .close()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to close Zenoh session: {}", e))?;
    info!("Sungrow bridge stopped");

    Ok(())
}
