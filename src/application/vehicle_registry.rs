// Registry trait for vehicles and their sensor assignments
use crate::domain::vehicle::{SensorBinding, Vehicle};
use async_trait::async_trait;

#[async_trait]
pub trait VehicleRegistry: Send + Sync {
    /// List all registered vehicles
    async fn list_vehicles(&self) -> anyhow::Result<Vec<Vehicle>>;

    /// Look up a single vehicle by id
    async fn find_vehicle(&self, vehicle_id: &str) -> anyhow::Result<Option<Vehicle>>;

    /// Active sensor to tire-position assignments for a vehicle
    async fn sensor_bindings(&self, vehicle_id: &str) -> anyhow::Result<Vec<SensorBinding>>;
}
