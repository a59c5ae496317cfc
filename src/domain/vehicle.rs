// Vehicle domain model as supplied by the vehicle registry
use serde::{Deserialize, Serialize};

use super::error::MonitorError;
use super::topology::{TirePosition, VehicleType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    /// Raw registry tag; resolved against the topology table only when monitored.
    pub vehicle_type: String,
    #[serde(default)]
    pub year: Option<i32>,
}

impl Vehicle {
    pub fn new(id: impl Into<String>, vehicle_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            alias: None,
            brand: None,
            model: None,
            vehicle_type: vehicle_type.into(),
            year: None,
        }
    }

    pub fn kind(&self) -> Result<VehicleType, MonitorError> {
        self.vehicle_type.parse()
    }

    /// "A01BC2D (Mack Anthem)" style label, falling back to the id.
    pub fn display_name(&self) -> String {
        let label = self.alias.as_deref().unwrap_or(&self.id);
        match (&self.brand, &self.model) {
            (Some(brand), Some(model)) => format!("{} ({} {})", label, brand, model),
            (Some(name), None) | (None, Some(name)) => format!("{} ({})", label, name),
            (None, None) => label.to_string(),
        }
    }
}

/// A sensor mounted at a tire position of a vehicle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorBinding {
    pub sensor_id: String,
    pub vehicle_id: String,
    pub position: TirePosition,
}
