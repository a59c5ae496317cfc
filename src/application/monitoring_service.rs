// Monitoring service - Use case for selecting, refreshing and reading a vehicle
use crate::application::dashboard_service::DashboardService;
use crate::application::ingestion::{IngestionAdapter, IngestionStats};
use crate::application::refresh_engine::{RandomSource, RefreshEngine, RefreshHandle, RngSource};
use crate::application::telemetry_store::SharedTelemetryStore;
use crate::application::vehicle_registry::VehicleRegistry;
use crate::domain::dashboard::DashboardView;
use crate::domain::error::MonitorError;
use crate::domain::reading::{Reading, TelemetrySnapshot};
use crate::domain::session::{SelectedVehicle, Session};
use crate::domain::topology::{TirePosition, TopologyTable, VehicleTopology};
use crate::domain::vehicle::{SensorBinding, Vehicle};
use crate::infrastructure::config::MonitoringSettings;
use std::sync::Arc;
use tokio::sync::Mutex;

pub type RandomFactory = Arc<dyn Fn() -> Box<dyn RandomSource> + Send + Sync>;

#[derive(Default)]
struct ActiveMonitor {
    session: Session,
    topology: Option<VehicleTopology>,
    bindings: Vec<SensorBinding>,
    refresh: Option<RefreshHandle>,
}

pub struct MonitoringService {
    registry: Arc<dyn VehicleRegistry>,
    topologies: Arc<TopologyTable>,
    store: SharedTelemetryStore,
    dashboard: DashboardService,
    ingestion: IngestionAdapter,
    settings: MonitoringSettings,
    random: RandomFactory,
    // Every select/stop/ingest goes through this lock: one writer per session.
    active: Mutex<ActiveMonitor>,
}

impl MonitoringService {
    pub fn new(
        registry: Arc<dyn VehicleRegistry>,
        topologies: Arc<TopologyTable>,
        settings: MonitoringSettings,
    ) -> Self {
        let store = SharedTelemetryStore::with_evaluator(settings.evaluator());
        Self {
            registry,
            topologies,
            ingestion: IngestionAdapter::new(store.clone()),
            dashboard: DashboardService::new(),
            active: Mutex::new(ActiveMonitor {
                session: Session::new(settings.operator.clone()),
                ..ActiveMonitor::default()
            }),
            store,
            settings,
            random: Arc::new(entropy_source),
        }
    }

    /// Replace the randomness used by every refresh loop started afterwards.
    pub fn with_random_source(mut self, random: RandomFactory) -> Self {
        self.random = random;
        self
    }

    pub fn topologies(&self) -> &TopologyTable {
        &self.topologies
    }

    pub fn store(&self) -> &SharedTelemetryStore {
        &self.store
    }

    pub fn settings(&self) -> &MonitoringSettings {
        &self.settings
    }

    pub async fn list_vehicles(&self) -> anyhow::Result<Vec<Vehicle>> {
        self.registry.list_vehicles().await
    }

    /// Bind the store to a vehicle and start its refresh loop.
    ///
    /// Any loop for the previous selection is stopped before the new
    /// snapshot is seeded, so two loops never run side by side.
    pub async fn select(&self, vehicle_id: &str) -> anyhow::Result<SelectedVehicle> {
        let vehicle = self
            .registry
            .find_vehicle(vehicle_id)
            .await?
            .ok_or_else(|| MonitorError::UnknownVehicle(vehicle_id.to_string()))?;
        let topology = self.topologies.topology_for_tag(&vehicle.vehicle_type)?.clone();

        let bindings: Vec<SensorBinding> = self
            .registry
            .sensor_bindings(vehicle_id)
            .await?
            .into_iter()
            .filter(|b| {
                let known = topology.contains(&b.position);
                if !known {
                    tracing::warn!(
                        sensor_id = %b.sensor_id,
                        position = %b.position,
                        vehicle_id,
                        "Ignoring sensor assigned to a position outside the topology"
                    );
                }
                known
            })
            .collect();

        let mut active = self.active.lock().await;
        if let Some(previous) = active.refresh.take() {
            let previous_epoch = previous.epoch();
            let ticks = previous.stop().await;
            tracing::debug!(epoch = previous_epoch, ticks, "Previous refresh loop stopped");
        }

        let epoch = self.store.select(&vehicle.id, &topology).await;
        if self.settings.simulate {
            let engine = RefreshEngine::new(
                self.settings.refresh_interval(),
                self.settings.fluctuation(),
                (self.random)(),
            );
            active.refresh = Some(engine.spawn(self.store.clone(), epoch));
        }

        tracing::info!(
            vehicle_id = %vehicle.id,
            operator = active.session.operator.as_deref().unwrap_or("-"),
            vehicle_type = %topology.vehicle_type,
            positions = topology.len(),
            sensors = bindings.len(),
            epoch,
            "Monitoring started"
        );

        active.session.select(vehicle, epoch);
        active.topology = Some(topology);
        active.bindings = bindings;

        active
            .session
            .selected
            .clone()
            .ok_or_else(|| MonitorError::NoVehicleSelected.into())
    }

    /// Stop monitoring. Returns false if nothing was selected.
    pub async fn stop(&self) -> bool {
        let mut active = self.active.lock().await;
        if let Some(refresh) = active.refresh.take() {
            refresh.stop().await;
        }
        self.store.clear().await;
        active.topology = None;
        active.bindings.clear();

        match active.session.deselect() {
            Some(selected) => {
                tracing::info!(vehicle_id = %selected.vehicle.id, epoch = selected.epoch, "Monitoring stopped");
                true
            }
            None => false,
        }
    }

    pub async fn session(&self) -> Session {
        self.active.lock().await.session.clone()
    }

    pub async fn snapshot(&self) -> TelemetrySnapshot {
        self.store.snapshot().await
    }

    pub async fn update(&self, position: &TirePosition, reading: Reading) -> Result<(), MonitorError> {
        let _active = self.active.lock().await;
        self.store.update(position, reading).await
    }

    pub async fn dashboard(&self) -> Result<DashboardView, MonitorError> {
        let active = self.active.lock().await;
        let (selected, topology) = match (&active.session.selected, &active.topology) {
            (Some(selected), Some(topology)) => (selected, topology),
            _ => return Err(MonitorError::NoVehicleSelected),
        };

        let view = self.store.view().await;
        Ok(self.dashboard.build(&selected.vehicle, topology, &view))
    }

    /// Apply a body of length-prefixed sensor packets to the selected vehicle.
    pub async fn ingest(&self, body: &[u8]) -> IngestionStats {
        let active = self.active.lock().await;
        self.ingestion.ingest_frames(body, &active.bindings).await
    }

    pub fn ingestion_stats(&self) -> IngestionStats {
        self.ingestion.stats()
    }
}

fn entropy_source() -> Box<dyn RandomSource> {
    Box::new(RngSource::from_entropy())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::application::refresh_engine::tests::ScriptedRandom;
    use crate::domain::alert::AlertLevel;
    use crate::domain::topology::VehicleType;
    use crate::infrastructure::chunked_frames::encode_frame;
    use crate::infrastructure::static_registry::StaticVehicleRegistry;
    use std::time::Duration;

    pub(crate) fn registry() -> StaticVehicleRegistry {
        let mut gandola = Vehicle::new("vehicle1", "camion_gandola");
        gandola.alias = Some("A01BC2D".to_string());
        StaticVehicleRegistry::new(
            vec![
                gandola,
                Vehicle::new("vehicle2", "camion_750"),
                Vehicle::new("vehicle3", "otro"),
                Vehicle::new("vehicle4", "monorail"),
            ],
            vec![SensorBinding {
                sensor_id: "SENSOR-TPMS-XYZ123".to_string(),
                vehicle_id: "vehicle2".to_string(),
                position: TirePosition::new("del_izq"),
            }],
        )
        .unwrap()
    }

    pub(crate) fn service_with(settings: MonitoringSettings) -> MonitoringService {
        MonitoringService::new(Arc::new(registry()), Arc::new(TopologyTable::builtin()), settings)
            .with_random_source(Arc::new(|| Box::new(ScriptedRandom::constant(1.0)) as Box<dyn RandomSource>))
    }

    fn expect_monitor_error(err: anyhow::Error) -> MonitorError {
        err.downcast::<MonitorError>().expect("monitor error")
    }

    #[tokio::test]
    async fn test_select_seeds_topology() {
        let service = service_with(MonitoringSettings::default());
        let selected = service.select("vehicle1").await.unwrap();
        assert_eq!(selected.vehicle.id, "vehicle1");

        let snapshot = service.snapshot().await;
        let positions = service.topologies().positions_for(VehicleType::TractorTrailer).unwrap();
        assert_eq!(snapshot.len(), positions.len());
        assert!(positions.iter().all(|p| snapshot.contains(p)));
        assert!(service.session().await.is_monitoring());
    }

    #[tokio::test]
    async fn test_unknown_vehicle_and_type_are_surfaced() {
        let service = service_with(MonitoringSettings::default());

        let err = expect_monitor_error(service.select("vehicle9").await.unwrap_err());
        assert_eq!(err, MonitorError::UnknownVehicle("vehicle9".to_string()));

        let err = expect_monitor_error(service.select("vehicle3").await.unwrap_err());
        assert_eq!(err, MonitorError::UnknownVehicleType("other".to_string()));

        let err = expect_monitor_error(service.select("vehicle4").await.unwrap_err());
        assert_eq!(err, MonitorError::UnknownVehicleType("monorail".to_string()));

        assert!(service.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_select_keeps_current_session() {
        let service = service_with(MonitoringSettings::default());
        service.select("vehicle2").await.unwrap();
        assert!(service.select("vehicle3").await.is_err());

        let session = service.session().await;
        assert_eq!(session.selected_vehicle().map(|v| v.id.as_str()), Some("vehicle2"));
        assert_eq!(service.snapshot().await.len(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_switch_cancels_previous_loop() {
        let service = service_with(MonitoringSettings::default());
        service.select("vehicle1").await.unwrap();
        tokio::time::sleep(Duration::from_secs(6)).await;

        service.select("vehicle2").await.unwrap();
        let fresh = service.snapshot().await;
        assert_eq!(fresh.len(), 6);
        assert!(!fresh.contains(&TirePosition::new("chuto_del_izq_ext")));

        // Only one loop runs: one tick moves pressure by exactly one step.
        tokio::time::sleep(Duration::from_secs(6)).await;
        let ticked = service.snapshot().await;
        let position = TirePosition::new("del_izq");
        assert_eq!(
            ticked.get(&position).unwrap().pressure,
            fresh.get(&position).unwrap().pressure + 2.0
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_clears_and_freezes() {
        let service = service_with(MonitoringSettings::default());
        service.select("vehicle2").await.unwrap();
        tokio::time::sleep(Duration::from_secs(6)).await;

        assert!(service.stop().await);
        assert!(service.snapshot().await.is_empty());
        assert_eq!(service.dashboard().await, Err(MonitorError::NoVehicleSelected));

        let mut revisions = service.store().subscribe();
        let _ = revisions.borrow_and_update();
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(!revisions.has_changed().unwrap());
        assert!(service.snapshot().await.is_empty());
        assert!(!service.stop().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulation_disabled_leaves_seed_alone() {
        let settings = MonitoringSettings {
            simulate: false,
            ..MonitoringSettings::default()
        };
        let service = service_with(settings);
        service.select("vehicle2").await.unwrap();
        let seeded = service.snapshot().await;

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(service.snapshot().await, seeded);
    }

    #[tokio::test]
    async fn test_dashboard_reflects_ingested_readings() {
        let settings = MonitoringSettings {
            simulate: false,
            ..MonitoringSettings::default()
        };
        let service = service_with(settings);
        service.select("vehicle2").await.unwrap();

        let body = encode_frame(br#"{"sensor_id":"SENSOR-TPMS-XYZ123","rpsi":20.0,"rtemp":25.0}"#);
        let stats = service.ingest(&body).await;
        assert_eq!(stats.accepted, 1);
        assert_eq!(service.ingestion_stats().accepted, 1);

        let dashboard = service.dashboard().await.unwrap();
        assert_eq!(dashboard.vehicle_id, "vehicle2");
        assert_eq!(dashboard.vehicle_type, "rigid-truck");
        assert_eq!(dashboard.tires[0].level, Some(AlertLevel::Critical));
        assert!(dashboard.fleet_alert);
    }

    #[tokio::test]
    async fn test_hysteresis_holds_critical_between_reads() {
        let settings = MonitoringSettings {
            simulate: false,
            hysteresis_band: 2.0,
            ..MonitoringSettings::default()
        };
        let service = service_with(settings);
        service.select("vehicle2").await.unwrap();

        let position = TirePosition::new("del_izq");
        service.update(&position, Reading::new(111.0, 30.0)).await.unwrap();
        service.update(&position, Reading::new(109.0, 30.0)).await.unwrap();

        let dashboard = service.dashboard().await.unwrap();
        assert_eq!(dashboard.tires[0].level, Some(AlertLevel::Critical));
    }

    #[tokio::test]
    async fn test_update_rejects_unknown_position() {
        let service = service_with(MonitoringSettings::default());
        service.select("vehicle2").await.unwrap();
        let before = service.snapshot().await;

        let result = service
            .update(&TirePosition::new("batea_e1_izq_ext"), Reading::new(90.0, 30.0))
            .await;
        assert!(matches!(result, Err(MonitorError::UnknownPosition(_))));
        assert_eq!(service.snapshot().await, before);
    }
}
