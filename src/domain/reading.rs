// Tire reading and snapshot domain models
use serde::Serialize;

use super::topology::TirePosition;

/// Physical envelope of a tire pressure sensor, in PSI.
pub const PRESSURE_MIN_PSI: f64 = 25.0;
pub const PRESSURE_MAX_PSI: f64 = 125.0;

/// Physical envelope of a tire temperature sensor, in °C.
pub const TEMPERATURE_MIN_C: f64 = 15.0;
pub const TEMPERATURE_MAX_C: f64 = 85.0;

const _: () = assert!(PRESSURE_MIN_PSI < PRESSURE_MAX_PSI);
const _: () = assert!(TEMPERATURE_MIN_C < TEMPERATURE_MAX_C);

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Reading {
    pub pressure: f64,
    pub temperature: f64,
}

impl Reading {
    pub fn new(pressure: f64, temperature: f64) -> Self {
        Self {
            pressure,
            temperature,
        }
    }

    /// Build a reading that is guaranteed to sit inside the physical envelope.
    pub fn clamped(pressure: f64, temperature: f64) -> Self {
        Self::new(pressure, temperature).clamp()
    }

    /// Clamp both fields to the physical envelope. NaN collapses to the lower bound.
    pub fn clamp(self) -> Self {
        Self {
            pressure: clamp_or_min(self.pressure, PRESSURE_MIN_PSI, PRESSURE_MAX_PSI),
            temperature: clamp_or_min(self.temperature, TEMPERATURE_MIN_C, TEMPERATURE_MAX_C),
        }
    }

    pub fn is_within_envelope(&self) -> bool {
        (PRESSURE_MIN_PSI..=PRESSURE_MAX_PSI).contains(&self.pressure)
            && (TEMPERATURE_MIN_C..=TEMPERATURE_MAX_C).contains(&self.temperature)
    }
}

fn clamp_or_min(value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() {
        min
    } else {
        value.clamp(min, max)
    }
}

/// Current readings for every position of the monitored vehicle, in topology order.
///
/// Positions without data are simply absent; a missing entry is never
/// represented as a zero reading.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TelemetrySnapshot {
    entries: Vec<(TirePosition, Reading)>,
}

impl TelemetrySnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, position: &TirePosition) -> Option<&Reading> {
        self.entries
            .iter()
            .find(|(p, _)| p == position)
            .map(|(_, r)| r)
    }

    pub fn contains(&self, position: &TirePosition) -> bool {
        self.get(position).is_some()
    }

    /// Overwrite an existing position. Returns false if the position is absent.
    pub(crate) fn replace(&mut self, position: &TirePosition, reading: Reading) -> bool {
        match self.entries.iter_mut().find(|(p, _)| p == position) {
            Some((_, slot)) => {
                *slot = reading;
                true
            }
            None => false,
        }
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (&TirePosition, &mut Reading)> {
        self.entries.iter_mut().map(|(p, r)| (&*p, r))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TirePosition, &Reading)> {
        self.entries.iter().map(|(p, r)| (p, r))
    }

    pub fn positions(&self) -> impl Iterator<Item = &TirePosition> {
        self.entries.iter().map(|(p, _)| p)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(TirePosition, Reading)> for TelemetrySnapshot {
    fn from_iter<I: IntoIterator<Item = (TirePosition, Reading)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
