// In-memory vehicle registry loaded from configuration
use crate::application::vehicle_registry::VehicleRegistry;
use crate::domain::vehicle::{SensorBinding, Vehicle};
use crate::infrastructure::config::VehiclesConfig;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashSet;

#[derive(Debug, Clone, Default)]
pub struct StaticVehicleRegistry {
    vehicles: Vec<Vehicle>,
    assignments: Vec<SensorBinding>,
}

impl StaticVehicleRegistry {
    pub fn new(vehicles: Vec<Vehicle>, assignments: Vec<SensorBinding>) -> Result<Self> {
        let mut ids = HashSet::new();
        for vehicle in &vehicles {
            if !ids.insert(vehicle.id.as_str()) {
                anyhow::bail!("Vehicle '{}' is registered more than once", vehicle.id);
            }
        }

        let mut sensors = HashSet::new();
        for binding in &assignments {
            if !ids.contains(binding.vehicle_id.as_str()) {
                anyhow::bail!(
                    "Sensor '{}' is assigned to unknown vehicle '{}'",
                    binding.sensor_id,
                    binding.vehicle_id
                );
            }
            if !sensors.insert(binding.sensor_id.as_str()) {
                anyhow::bail!("Sensor '{}' is assigned more than once", binding.sensor_id);
            }
        }

        Ok(Self {
            vehicles,
            assignments,
        })
    }

    pub fn from_config(config: VehiclesConfig) -> Result<Self> {
        Self::new(config.vehicles, config.assignments)
    }
}

#[async_trait]
impl VehicleRegistry for StaticVehicleRegistry {
    async fn list_vehicles(&self) -> Result<Vec<Vehicle>> {
        Ok(self.vehicles.clone())
    }

    async fn find_vehicle(&self, vehicle_id: &str) -> Result<Option<Vehicle>> {
        Ok(self.vehicles.iter().find(|v| v.id == vehicle_id).cloned())
    }

    async fn sensor_bindings(&self, vehicle_id: &str) -> Result<Vec<SensorBinding>> {
        Ok(self
            .assignments
            .iter()
            .filter(|b| b.vehicle_id == vehicle_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::topology::TirePosition;

    fn binding(sensor_id: &str, vehicle_id: &str, position: &str) -> SensorBinding {
        SensorBinding {
            sensor_id: sensor_id.to_string(),
            vehicle_id: vehicle_id.to_string(),
            position: TirePosition::new(position),
        }
    }

    #[tokio::test]
    async fn test_lookup_and_bindings() {
        let registry = StaticVehicleRegistry::new(
            vec![Vehicle::new("vehicle1", "camion_gandola"), Vehicle::new("vehicle2", "camion_750")],
            vec![
                binding("s1", "vehicle1", "chuto_del_izq_ext"),
                binding("s2", "vehicle2", "del_izq"),
            ],
        )
        .unwrap();

        assert_eq!(registry.list_vehicles().await.unwrap().len(), 2);
        assert_eq!(
            registry.find_vehicle("vehicle2").await.unwrap().map(|v| v.vehicle_type),
            Some("camion_750".to_string())
        );
        assert!(registry.find_vehicle("vehicle9").await.unwrap().is_none());

        let bindings = registry.sensor_bindings("vehicle1").await.unwrap();
        assert_eq!(bindings, vec![binding("s1", "vehicle1", "chuto_del_izq_ext")]);
    }

    #[test]
    fn test_rejects_duplicate_vehicle() {
        let result = StaticVehicleRegistry::new(
            vec![Vehicle::new("vehicle1", "bus"), Vehicle::new("vehicle1", "pickup")],
            vec![],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_orphan_and_duplicate_sensors() {
        let vehicles = vec![Vehicle::new("vehicle1", "bus")];
        assert!(StaticVehicleRegistry::new(vehicles.clone(), vec![binding("s1", "vehicle9", "del_izq")]).is_err());
        assert!(StaticVehicleRegistry::new(
            vehicles,
            vec![binding("s1", "vehicle1", "del_izq"), binding("s1", "vehicle1", "del_der")]
        )
        .is_err());
    }
}
