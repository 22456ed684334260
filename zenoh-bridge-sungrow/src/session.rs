//! Zenoh session management.

use anyhow::Context;
use zenoh::Session;

use crate::config::ZenohConfig;

/// Open a Zenoh session using the provided configuration.
pub async fn connect(config: &ZenohConfig) -> anyhow::Result<Session> {
    let mut zenoh_config = zenoh::Config::default();

    zenoh_config
        .insert_json5("mode", &format!("\"{}\"", config.mode))
        .map_err(|e| anyhow::anyhow!("Failed to set mode: {}", e))?;

    for (key, endpoints) in [
        ("connect/endpoints", &config.connect),
        ("listen/endpoints", &config.listen),
    ] {
        if endpoints.is_empty() {
            continue;
        }
        let json = serde_json::to_string(endpoints)
            .with_context(|| format!("Failed to serialize {}", key))?;
        zenoh_config
            .insert_json5(key, &json)
            .map_err(|e| anyhow::anyhow!("Failed to set {}: {}", key, e))?;
    }

    tracing::info!(
        mode = %config.mode,
        connect = ?config.connect,
        listen = ?config.listen,
        "Connecting to Zenoh"
    );

    let session = zenoh::open(zenoh_config)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect to Zenoh: {}", e))?;

    tracing::info!(zid = %session.zid(), "Connected to Zenoh");

    Ok(session)
}
