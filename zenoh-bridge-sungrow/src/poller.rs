//! Interval-driven polling of one inverter and telemetry publishing.

use std::sync::Arc;
use std::time::Duration;

use sungrow_modbus::{
    Model, ModelRegistry, PollCycle, PollError, PollSnapshot, RegisterTransport, Sensor, SnapshotStore,
    sensors_for,
};
use tracing::{debug, error, info, warn};
use zenoh::Session;

use crate::config::DeviceConfig;
use crate::telemetry::{DeviceStatusReport, Format, SensorReading, encode};
use crate::transport::ModbusTransport;

/// What the driver does after a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Keep the connection and poll again next tick.
    Continue,
    /// Drop the connection; the next tick reconnects.
    Reconnect,
    /// Stop polling this device.
    Stop,
}

/// Decide how to proceed after a cycle that ended in `error`.
pub fn outcome_for(error: &PollError) -> CycleOutcome {
    match error {
        PollError::Identity(e) if e.is_connection_lost() => CycleOutcome::Reconnect,
        e if e.is_retryable() => CycleOutcome::Continue,
        _ => CycleOutcome::Stop,
    }
}

/// Decide how to proceed after a cycle that produced `snapshot`.
///
/// A block that timed out or came back with the wrong length may leave a late
/// response queued on the connection, so the connection is replaced.
pub fn outcome_for_snapshot(snapshot: &PollSnapshot) -> CycleOutcome {
    if snapshot.requires_reconnect() {
        CycleOutcome::Reconnect
    } else {
        CycleOutcome::Continue
    }
}

/// Runs poll cycles for one device and publishes the results.
pub struct DevicePoller {
    device: DeviceConfig,
    registry: Arc<ModelRegistry>,
    store: SnapshotStore,
    session: Arc<Session>,
    key_prefix: String,
    format: Format,
    sensors: Vec<Sensor>,
    sensor_model: Option<Model>,
}

impl DevicePoller {
    /// Create a new poller for a device.
    pub fn new(
        device: DeviceConfig,
        registry: Arc<ModelRegistry>,
        session: Arc<Session>,
        key_prefix: impl Into<String>,
        format: Format,
    ) -> Self {
        Self {
            device,
            registry,
            store: SnapshotStore::new(),
            session,
            key_prefix: key_prefix.into(),
            format,
            sensors: Vec::new(),
            sensor_model: None,
        }
    }

    /// Store holding this device's latest snapshot.
    pub fn store(&self) -> SnapshotStore {
        self.store.clone()
    }

    /// Run the polling loop until the device turns out to be unsupported.
    pub async fn run(mut self) {
        let interval = Duration::from_secs(self.device.poll_interval_secs);
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut transport: Option<ModbusTransport> = None;

        info!(
            device = %self.device.name,
            connection = %self.device.connection,
            interval_secs = self.device.poll_interval_secs,
            "Starting Sungrow poller"
        );

        loop {
            ticker.tick().await;

            let conn = match transport.as_mut() {
                Some(conn) => conn,
                None => match ModbusTransport::connect(&self.device).await {
                    Ok(conn) => {
                        debug!(device = %self.device.name, "Connected");
                        transport.insert(conn)
                    }
                    Err(e) => {
                        warn!(device = %self.device.name, error = %e, "Connection failed");
                        self.publish_status(&DeviceStatusReport::from_error(
                            &self.device.name,
                            &PollError::Identity(e),
                        ))
                        .await;
                        continue;
                    }
                },
            };

            match self.poll_once(conn).await {
                CycleOutcome::Continue => {}
                CycleOutcome::Reconnect => {
                    debug!(device = %self.device.name, "Dropping connection");
                    transport = None;
                }
                CycleOutcome::Stop => {
                    error!(
                        device = %self.device.name,
                        "Polling stopped; the device model needs to be added before it can be polled"
                    );
                    return;
                }
            }
        }
    }

    /// Run one cycle, publish its result and report how to continue.
    pub async fn poll_once<T: RegisterTransport>(&mut self, transport: &mut T) -> CycleOutcome {
        let mut cycle = PollCycle::new(&self.registry, self.device.unit_id);

        match cycle.run(transport).await {
            Ok(snapshot) => {
                let snapshot = self.store.publish(snapshot);
                self.refresh_sensors(&snapshot);
                let count = self.publish_snapshot(&snapshot).await;
                debug!(
                    device = %self.device.name,
                    published = count,
                    failed_blocks = snapshot.failed_blocks().len(),
                    "Poll cycle complete"
                );
                outcome_for_snapshot(&snapshot)
            }
            Err(e) => {
                let outcome = outcome_for(&e);
                self.publish_status(&DeviceStatusReport::from_error(&self.device.name, &e))
                    .await;
                self.store.record_failure(e);
                outcome
            }
        }
    }

    /// Rebuild the sensor list when the reported model changes.
    fn refresh_sensors(&mut self, snapshot: &PollSnapshot) {
        if self.sensor_model == Some(snapshot.model()) {
            return;
        }

        if let Some(definition) = self.registry.get(snapshot.identity_code()) {
            self.sensors = sensors_for(definition, &self.device.name, self.device.unit_id);
            self.sensor_model = Some(snapshot.model());
            info!(
                device = %self.device.name,
                model = %snapshot.model(),
                sensors = self.sensors.len(),
                "Resolved inverter model"
            );
        }
    }

    /// Publish one reading per sensor plus the device status.
    async fn publish_snapshot(&self, snapshot: &PollSnapshot) -> usize {
        let mut count = 0;

        for sensor in &self.sensors {
            let reading = SensorReading::from_snapshot(&self.device.name, sensor, snapshot);
            let key = build_key_expr(
                &self.key_prefix,
                &self.device.name,
                &sensor.address().to_string(),
            );
            if self.put(&key, &reading).await {
                count += 1;
            }
        }

        self.publish_status(&DeviceStatusReport::from_snapshot(&self.device.name, snapshot))
            .await;

        count
    }

    async fn publish_status(&self, report: &DeviceStatusReport) {
        let key = build_key_expr(&self.key_prefix, &self.device.name, "@/status");
        self.put(&key, report).await;
    }

    async fn put<T: serde::Serialize>(&self, key: &str, value: &T) -> bool {
        let payload = match encode(value, self.format) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to encode payload");
                return false;
            }
        };

        match self.session.put(key, payload).await {
            Ok(()) => true,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to publish");
                false
            }
        }
    }
}

/// Build a key expression for a device-level key.
pub fn build_key_expr(prefix: &str, device: &str, suffix: &str) -> String {
    format!("{}/{}/{}", prefix, device, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sungrow_modbus::testing::MockTransport;
    use sungrow_modbus::{RegisterSpace, TransportError};

    #[test]
    fn test_build_key_expr() {
        assert_eq!(build_key_expr("sungrow", "roof", "5007"), "sungrow/roof/5007");
        assert_eq!(
            build_key_expr("sungrow", "roof", "@/status"),
            "sungrow/roof/@/status"
        );
    }

    #[test]
    fn test_outcomes() {
        assert_eq!(
            outcome_for(&PollError::Identity(TransportError::Timeout)),
            CycleOutcome::Reconnect
        );
        assert_eq!(
            outcome_for(&PollError::Identity(TransportError::Exception(
                "SlaveDeviceBusy".into()
            ))),
            CycleOutcome::Continue
        );
        assert_eq!(
            outcome_for(&PollError::IdentityWordCount(0)),
            CycleOutcome::Continue
        );
        assert_eq!(
            outcome_for(&PollError::UnsupportedModel(0xFFFF)),
            CycleOutcome::Stop
        );
    }

    async fn sh10rt_snapshot(transport: &mut MockTransport) -> PollSnapshot {
        let registry = ModelRegistry::builtin().unwrap();
        PollCycle::new(&registry, 1).run(transport).await.unwrap()
    }

    fn sh10rt_device() -> MockTransport {
        let mut transport = MockTransport::with_identity(0x0E03);
        transport.set_input(5010, &[3512, 42, 3498, 40]);
        transport
    }

    #[tokio::test]
    async fn test_block_timeout_drops_connection() {
        let mut transport = sh10rt_device();
        transport.fail_read(RegisterSpace::Input, 5007, TransportError::Timeout);

        let snapshot = sh10rt_snapshot(&mut transport).await;

        assert!(snapshot.get(5010).is_some());
        assert_eq!(outcome_for_snapshot(&snapshot), CycleOutcome::Reconnect);
    }

    #[tokio::test]
    async fn test_short_block_drops_connection() {
        let mut transport = sh10rt_device();
        transport.truncate_read(RegisterSpace::Input, 5010, 1);

        let snapshot = sh10rt_snapshot(&mut transport).await;

        assert_eq!(outcome_for_snapshot(&snapshot), CycleOutcome::Reconnect);
    }

    #[tokio::test]
    async fn test_exception_keeps_connection() {
        let mut transport = sh10rt_device();
        transport.fail_read(
            RegisterSpace::Input,
            5007,
            TransportError::Exception("IllegalDataAddress".into()),
        );

        let snapshot = sh10rt_snapshot(&mut transport).await;
        assert_eq!(outcome_for_snapshot(&snapshot), CycleOutcome::Continue);

        let snapshot = sh10rt_snapshot(&mut sh10rt_device()).await;
        assert_eq!(outcome_for_snapshot(&snapshot), CycleOutcome::Continue);
    }
}
