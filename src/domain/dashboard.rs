// Dashboard domain model
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::alert::AlertLevel;
use super::reading::Reading;
use super::topology::TirePosition;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TireStatus {
    pub position: TirePosition,
    pub reading: Option<Reading>,
    pub level: Option<AlertLevel>,
}

impl TireStatus {
    pub fn new(position: TirePosition, reading: Option<Reading>, level: Option<AlertLevel>) -> Self {
        Self {
            position,
            reading,
            level,
        }
    }

    pub fn no_data(position: TirePosition) -> Self {
        Self::new(position, None, None)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub vehicle_id: String,
    pub vehicle_name: String,
    pub vehicle_type: String,
    pub epoch: u64,
    pub generated_at: DateTime<Utc>,
    pub tires: Vec<TireStatus>,
    pub fleet_alert: bool,
}

impl DashboardView {
    pub fn worst_level(&self) -> Option<AlertLevel> {
        self.tires.iter().filter_map(|t| t.level).max()
    }
}
