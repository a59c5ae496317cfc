// Refresh engine - simulated telemetry feed for the monitored vehicle
//
// Each tick perturbs every reading in the snapshot by a bounded uniform step
// and clamps the result to the physical envelope. The loop is bound to one
// store epoch and stops as soon as it is cancelled or the epoch moves on.
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::application::telemetry_store::SharedTelemetryStore;
use crate::domain::reading::{Reading, TelemetrySnapshot};

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(5);

/// Source of uniform perturbations; swapped for a scripted one in tests.
pub trait RandomSource: Send {
    /// A value in `[low, high]`. Non-finite bounds yield 0.0.
    fn uniform(&mut self, low: f64, high: f64) -> f64;
}

pub struct RngSource<R>(R);

impl RngSource<StdRng> {
    pub fn from_entropy() -> Self {
        Self(StdRng::from_os_rng())
    }

    pub fn seeded(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng + Send> RandomSource for RngSource<R> {
    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        if !(low.is_finite() && high.is_finite()) {
            return 0.0;
        }
        if low >= high {
            return low;
        }
        self.0.random_range(low..=high)
    }
}

/// Maximum step per tick for each field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fluctuation {
    pub pressure_step: f64,
    pub temperature_step: f64,
}

impl Default for Fluctuation {
    fn default() -> Self {
        Self {
            pressure_step: 2.0,
            temperature_step: 1.0,
        }
    }
}

pub fn next_reading(previous: &Reading, fluctuation: &Fluctuation, rng: &mut dyn RandomSource) -> Reading {
    let dp = rng.uniform(-fluctuation.pressure_step, fluctuation.pressure_step);
    let dt = rng.uniform(-fluctuation.temperature_step, fluctuation.temperature_step);
    Reading::clamped(previous.pressure + dp, previous.temperature + dt)
}

pub struct RefreshEngine {
    interval: Duration,
    fluctuation: Fluctuation,
    rng: Box<dyn RandomSource>,
}

impl RefreshEngine {
    pub fn new(interval: Duration, fluctuation: Fluctuation, rng: Box<dyn RandomSource>) -> Self {
        Self {
            interval,
            fluctuation,
            rng,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Advance every position present in the snapshot by one tick.
    pub fn step(&mut self, snapshot: &mut TelemetrySnapshot) {
        for (_, reading) in snapshot.iter_mut() {
            *reading = next_reading(reading, &self.fluctuation, self.rng.as_mut());
        }
    }

    /// Tick until cancelled or until the store leaves `epoch`. Returns the tick count.
    pub async fn run(mut self, store: SharedTelemetryStore, epoch: u64, cancel: CancellationToken) -> u64 {
        let mut interval = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut ticks = 0u64;

        tracing::info!(
            epoch,
            interval_ms = self.interval.as_millis() as u64,
            "Refresh loop started"
        );

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!(epoch, ticks, "Refresh loop cancelled");
                    break;
                }
                _ = interval.tick() => {
                    let applied = store
                        .apply(epoch, |s| {
                            // Checked under the write lock so nothing lands after cancel.
                            if cancel.is_cancelled() {
                                return false;
                            }
                            self.step(s.snapshot_mut());
                            true
                        })
                        .await;

                    match applied {
                        Some(true) => {
                            ticks += 1;
                            tracing::debug!(epoch, ticks, "Refresh tick applied");
                        }
                        Some(false) => break,
                        None => {
                            tracing::debug!(epoch, ticks, "Session replaced, refresh loop exiting");
                            break;
                        }
                    }
                }
            }
        }

        ticks
    }

    pub fn spawn(self, store: SharedTelemetryStore, epoch: u64) -> RefreshHandle {
        let cancel = CancellationToken::new();
        let join = tokio::spawn(self.run(store, epoch, cancel.clone()));
        RefreshHandle {
            epoch,
            _guard: cancel.clone().drop_guard(),
            cancel,
            join,
        }
    }
}

/// Owner of a running refresh loop. Dropping the handle cancels the loop.
pub struct RefreshHandle {
    epoch: u64,
    cancel: CancellationToken,
    join: JoinHandle<u64>,
    _guard: DropGuard,
}

impl RefreshHandle {
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Cancel and wait for the loop to exit. Returns the number of applied ticks.
    pub async fn stop(self) -> u64 {
        self.cancel.cancel();
        match self.join.await {
            Ok(ticks) => ticks,
            Err(e) => {
                tracing::warn!(epoch = self.epoch, error = %e, "Refresh loop ended abnormally");
                0
            }
        }
    }
}
