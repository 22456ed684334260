//! Publication of the latest snapshot to concurrent readers.

use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::watch;

use crate::decoder::Value;
use crate::error::PollError;
use crate::poll::PollSnapshot;
use crate::sensor::Sensor;

/// Holds the most recent [`PollSnapshot`] of one device.
///
/// Publishing swaps the whole snapshot, so readers never observe a
/// half-populated one. Cheap to clone; clones share the same state.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    snapshots: watch::Sender<Option<Arc<PollSnapshot>>>,
    last_error: RwLock<Option<PollError>>,
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotStore {
    pub fn new() -> Self {
        let (snapshots, _) = watch::channel(None);
        Self {
            inner: Arc::new(Inner {
                snapshots,
                last_error: RwLock::new(None),
            }),
        }
    }

    /// Replace the current snapshot and clear any recorded failure.
    pub fn publish(&self, snapshot: PollSnapshot) -> Arc<PollSnapshot> {
        let snapshot = Arc::new(snapshot);
        self.inner.snapshots.send_replace(Some(snapshot.clone()));
        self.set_last_error(None);
        snapshot
    }

    /// Record a failed cycle. The current snapshot is left in place.
    pub fn record_failure(&self, error: PollError) {
        self.set_last_error(Some(error));
    }

    fn set_last_error(&self, error: Option<PollError>) {
        *self
            .inner
            .last_error
            .write()
            .unwrap_or_else(PoisonError::into_inner) = error;
    }

    /// The most recently published snapshot, if any.
    pub fn latest(&self) -> Option<Arc<PollSnapshot>> {
        self.inner.snapshots.borrow().clone()
    }

    /// Failure of the most recent cycle, cleared by the next publish.
    pub fn last_error(&self) -> Option<PollError> {
        self.inner
            .last_error
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Receive a notification for every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<PollSnapshot>>> {
        self.inner.snapshots.subscribe()
    }

    /// Current value for `sensor`, `None` when unknown.
    pub fn value(&self, sensor: &Sensor) -> Option<Value> {
        let snapshot = self.latest();
        sensor.value(snapshot.as_deref()).cloned()
    }
}
