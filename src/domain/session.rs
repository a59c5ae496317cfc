// Explicit monitoring session state
use serde::Serialize;

use super::vehicle::Vehicle;

/// The vehicle currently bound to the telemetry store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectedVehicle {
    pub vehicle: Vehicle,
    /// Store epoch handed out by `select`; stale writers carry an older one.
    pub epoch: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Session {
    pub operator: Option<String>,
    pub selected: Option<SelectedVehicle>,
}

impl Session {
    pub fn new(operator: Option<String>) -> Self {
        Self {
            operator,
            selected: None,
        }
    }

    pub fn select(&mut self, vehicle: Vehicle, epoch: u64) {
        self.selected = Some(SelectedVehicle { vehicle, epoch });
    }

    /// Drop the selection, returning what was selected.
    pub fn deselect(&mut self) -> Option<SelectedVehicle> {
        self.selected.take()
    }

    pub fn selected_vehicle(&self) -> Option<&Vehicle> {
        self.selected.as_ref().map(|s| &s.vehicle)
    }

    pub fn is_monitoring(&self) -> bool {
        self.selected.is_some()
    }
}
