// Dashboard service - Use case for building the monitoring dashboard
use crate::application::telemetry_store::StoreView;
use crate::domain::alert::fleet_alert;
use crate::domain::dashboard::{DashboardView, TireStatus};
use crate::domain::topology::VehicleTopology;
use crate::domain::vehicle::Vehicle;
use chrono::Utc;

/// Turns a store view into the dashboard payload.
///
/// Levels come from the store, which evaluates them on every write.
#[derive(Debug, Clone, Copy, Default)]
pub struct DashboardService;

impl DashboardService {
    pub fn new() -> Self {
        Self
    }

    pub fn build(&self, vehicle: &Vehicle, topology: &VehicleTopology, view: &StoreView) -> DashboardView {
        let tires: Vec<TireStatus> = topology
            .positions()
            .iter()
            .map(|position| match view.snapshot.get(position) {
                Some(reading) => {
                    let level = view.levels.get(position).copied();
                    TireStatus::new(position.clone(), Some(*reading), level)
                }
                None => TireStatus::no_data(position.clone()),
            })
            .collect();

        let alert = fleet_alert(&view.snapshot);
        if alert {
            tracing::debug!(vehicle_id = %vehicle.id, epoch = view.epoch, "Fleet alert raised");
        }

        DashboardView {
            vehicle_id: vehicle.id.clone(),
            vehicle_name: vehicle.display_name(),
            vehicle_type: topology.vehicle_type.to_string(),
            epoch: view.epoch,
            generated_at: Utc::now(),
            tires,
            fleet_alert: alert,
        }
    }
}
