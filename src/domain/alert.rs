// Alert evaluation - per-tire levels and the fleet banner
//
// Two threshold bands are in play. Per-tire levels use the pressure band plus
// a 60 °C warning line; the fleet banner shares the pressure band but only
// trips above 70 °C, so a tire can be WARNING without raising the banner.
use serde::Serialize;

use super::reading::{Reading, TelemetrySnapshot};

pub const PRESSURE_CRITICAL_LOW_PSI: f64 = 30.0;
pub const PRESSURE_CRITICAL_HIGH_PSI: f64 = 110.0;
pub const TEMPERATURE_WARNING_C: f64 = 60.0;
pub const FLEET_TEMPERATURE_C: f64 = 70.0;

const _: () = assert!(PRESSURE_CRITICAL_LOW_PSI < PRESSURE_CRITICAL_HIGH_PSI);
const _: () = assert!(TEMPERATURE_WARNING_C < FLEET_TEMPERATURE_C);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertLevel {
    Ok,
    Warning,
    Critical,
}

/// Classify a single reading with no memory of previous levels.
pub fn classify(reading: &Reading) -> AlertLevel {
    if pressure_out_of_band(reading.pressure, 0.0) {
        AlertLevel::Critical
    } else if reading.temperature > TEMPERATURE_WARNING_C {
        AlertLevel::Warning
    } else {
        AlertLevel::Ok
    }
}

/// True if any reading in the snapshot breaches the fleet band.
pub fn fleet_alert(snapshot: &TelemetrySnapshot) -> bool {
    snapshot.iter().any(|(_, reading)| breaches_fleet_band(reading))
}

pub fn breaches_fleet_band(reading: &Reading) -> bool {
    pressure_out_of_band(reading.pressure, 0.0) || reading.temperature > FLEET_TEMPERATURE_C
}

fn pressure_out_of_band(pressure: f64, margin: f64) -> bool {
    pressure < PRESSURE_CRITICAL_LOW_PSI + margin || pressure > PRESSURE_CRITICAL_HIGH_PSI - margin
}

/// Stateless evaluator with an optional hysteresis band.
///
/// With a zero band this is exactly [`classify`]: a reading hovering on a
/// threshold flips level on every evaluation. With a positive band, a tire
/// keeps its previous escalated level until the reading has moved `band`
/// units back inside the threshold. The caller owns the previous level.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AlertEvaluator {
    hysteresis_band: f64,
}

impl AlertEvaluator {
    pub fn new(hysteresis_band: f64) -> Self {
        Self {
            hysteresis_band: hysteresis_band.max(0.0),
        }
    }

    pub fn hysteresis_band(&self) -> f64 {
        self.hysteresis_band
    }

    pub fn evaluate(&self, reading: &Reading, previous: Option<AlertLevel>) -> AlertLevel {
        let level = classify(reading);
        let band = self.hysteresis_band;
        if band == 0.0 {
            return level;
        }

        match previous {
            Some(AlertLevel::Critical) if pressure_out_of_band(reading.pressure, band) => {
                AlertLevel::Critical
            }
            Some(AlertLevel::Warning)
                if level < AlertLevel::Warning
                    && reading.temperature > TEMPERATURE_WARNING_C - band =>
            {
                AlertLevel::Warning
            }
            _ => level,
        }
    }
}
