// Telemetry store - current readings for the monitored vehicle
use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{watch, RwLock};

use crate::domain::alert::{AlertEvaluator, AlertLevel};
use crate::domain::error::MonitorError;
use crate::domain::reading::{Reading, TelemetrySnapshot};
use crate::domain::topology::{TirePosition, VehicleTopology};

/// Snapshot owner for a single monitored vehicle.
///
/// Every `select` and `clear` bumps the epoch, so a writer holding an older
/// epoch can tell its session is gone. Alert levels are re-evaluated on every
/// write, so hysteresis sees each reading even if nobody reads in between.
#[derive(Debug, Default)]
pub struct TelemetryStore {
    vehicle_id: Option<String>,
    topology: Option<VehicleTopology>,
    snapshot: TelemetrySnapshot,
    levels: HashMap<TirePosition, AlertLevel>,
    evaluator: AlertEvaluator,
    epoch: u64,
    dirty: bool,
}

impl TelemetryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_evaluator(evaluator: AlertEvaluator) -> Self {
        Self {
            evaluator,
            ..Self::default()
        }
    }

    /// Bind to a vehicle and seed one reading per topology position.
    /// Any previous snapshot is discarded, never merged.
    pub fn select(&mut self, vehicle_id: &str, topology: &VehicleTopology) -> u64 {
        self.snapshot = topology
            .positions()
            .iter()
            .map(|p| (p.clone(), topology.seed_for(p).clamp()))
            .collect();
        self.vehicle_id = Some(vehicle_id.to_string());
        self.topology = Some(topology.clone());
        self.levels.clear();
        self.evaluate_levels();
        self.epoch += 1;
        self.epoch
    }

    pub fn get(&self) -> &TelemetrySnapshot {
        &self.snapshot
    }

    /// Overwrite one position. Readings are clamped to the physical envelope.
    pub fn update(&mut self, position: &TirePosition, reading: Reading) -> Result<(), MonitorError> {
        let known = self
            .topology
            .as_ref()
            .is_some_and(|t| t.contains(position));
        let reading = reading.clamp();
        if !known || !self.snapshot.replace(position, reading) {
            return Err(MonitorError::UnknownPosition(position.to_string()));
        }
        let previous = self.levels.get(position).copied();
        self.levels
            .insert(position.clone(), self.evaluator.evaluate(&reading, previous));
        Ok(())
    }

    pub fn clear(&mut self) {
        self.snapshot = TelemetrySnapshot::new();
        self.vehicle_id = None;
        self.topology = None;
        self.levels.clear();
        self.epoch += 1;
    }

    pub fn vehicle_id(&self) -> Option<&str> {
        self.vehicle_id.as_deref()
    }

    pub fn topology(&self) -> Option<&VehicleTopology> {
        self.topology.as_ref()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Level of a position as of the latest write, `None` when it has no data.
    pub fn level(&self, position: &TirePosition) -> Option<AlertLevel> {
        self.levels.get(position).copied()
    }

    /// Mutable access for bulk writers. Levels are re-evaluated once the
    /// surrounding `SharedTelemetryStore::apply` returns.
    pub(crate) fn snapshot_mut(&mut self) -> &mut TelemetrySnapshot {
        self.dirty = true;
        &mut self.snapshot
    }

    fn evaluate_levels(&mut self) {
        for (position, reading) in self.snapshot.iter() {
            let previous = self.levels.get(position).copied();
            let level = self.evaluator.evaluate(reading, previous);
            self.levels.insert(position.clone(), level);
        }
    }
}

/// Published after every write so readers know when to take a fresh copy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Revision {
    pub epoch: u64,
    pub seq: u64,
}

/// Point-in-time copy handed to readers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreView {
    pub vehicle_id: Option<String>,
    pub epoch: u64,
    pub snapshot: TelemetrySnapshot,
    pub levels: HashMap<TirePosition, AlertLevel>,
}

/// Shared handle: writes are serialized through the lock, readers get copies.
#[derive(Clone)]
pub struct SharedTelemetryStore {
    inner: Arc<RwLock<TelemetryStore>>,
    revisions: Arc<watch::Sender<Revision>>,
}

impl SharedTelemetryStore {
    pub fn new() -> Self {
        Self::with_evaluator(AlertEvaluator::default())
    }

    pub fn with_evaluator(evaluator: AlertEvaluator) -> Self {
        let (revisions, _) = watch::channel(Revision::default());
        Self {
            inner: Arc::new(RwLock::new(TelemetryStore::with_evaluator(evaluator))),
            revisions: Arc::new(revisions),
        }
    }

    pub async fn select(&self, vehicle_id: &str, topology: &VehicleTopology) -> u64 {
        let mut store = self.inner.write().await;
        let epoch = store.select(vehicle_id, topology);
        self.publish(epoch);
        epoch
    }

    pub async fn clear(&self) {
        let mut store = self.inner.write().await;
        store.clear();
        self.publish(store.epoch());
    }

    pub async fn update(&self, position: &TirePosition, reading: Reading) -> Result<(), MonitorError> {
        let mut store = self.inner.write().await;
        store.update(position, reading)?;
        self.publish(store.epoch());
        Ok(())
    }

    /// Run `f` against the store only if `epoch` is still the active session.
    ///
    /// A revision is published only if `f` touched the snapshot.
    pub async fn apply<R>(&self, epoch: u64, f: impl FnOnce(&mut TelemetryStore) -> R) -> Option<R> {
        let mut store = self.inner.write().await;
        if store.epoch() != epoch {
            return None;
        }
        store.dirty = false;
        let result = f(&mut store);
        if store.dirty {
            store.dirty = false;
            store.evaluate_levels();
            self.publish(epoch);
        }
        Some(result)
    }

    pub async fn snapshot(&self) -> TelemetrySnapshot {
        self.inner.read().await.get().clone()
    }

    pub async fn view(&self) -> StoreView {
        let store = self.inner.read().await;
        StoreView {
            vehicle_id: store.vehicle_id().map(str::to_string),
            epoch: store.epoch(),
            snapshot: store.get().clone(),
            levels: store.levels.clone(),
        }
    }

    pub async fn epoch(&self) -> u64 {
        self.inner.read().await.epoch()
    }

    pub fn subscribe(&self) -> watch::Receiver<Revision> {
        self.revisions.subscribe()
    }

    fn publish(&self, epoch: u64) {
        self.revisions.send_modify(|rev| {
            rev.epoch = epoch;
            rev.seq += 1;
        });
    }
}

impl Default for SharedTelemetryStore {
    fn default() -> Self {
        Self::new()
    }
}
