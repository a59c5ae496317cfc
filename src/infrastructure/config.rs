use crate::domain::alert::AlertEvaluator;
use crate::domain::topology::{TirePosition, TopologyTable, VehicleTopology, VehicleType};
use crate::domain::vehicle::{SensorBinding, Vehicle};
use crate::application::refresh_engine::{Fluctuation, DEFAULT_REFRESH_INTERVAL};
use anyhow::Context;
use config::builder::DefaultState;
use config::ConfigBuilder;
use serde::Deserialize;
use std::time::Duration;

const ENV_PREFIX: &str = "TIRE";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct MonitorConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub monitoring: MonitoringSettings,
    #[serde(default)]
    pub topologies: Vec<TopologyConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct MonitoringSettings {
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: f64,
    /// Run the simulated feed; when false readings only arrive via ingestion.
    #[serde(default = "default_true")]
    pub simulate: bool,
    #[serde(default)]
    pub hysteresis_band: f64,
    #[serde(default = "default_pressure_step")]
    pub pressure_step: f64,
    #[serde(default = "default_temperature_step")]
    pub temperature_step: f64,
    #[serde(default = "default_stream_buffer")]
    pub stream_buffer: usize,
    /// Recorded on the monitoring session for log context.
    #[serde(default)]
    pub operator: Option<String>,
}

impl Default for MonitoringSettings {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_refresh_interval_secs(),
            simulate: true,
            hysteresis_band: 0.0,
            pressure_step: default_pressure_step(),
            temperature_step: default_temperature_step(),
            stream_buffer: default_stream_buffer(),
            operator: None,
        }
    }
}

impl MonitoringSettings {
    pub fn refresh_interval(&self) -> Duration {
        if self.refresh_interval_secs.is_finite() && self.refresh_interval_secs > 0.0 {
            Duration::from_secs_f64(self.refresh_interval_secs)
        } else {
            DEFAULT_REFRESH_INTERVAL
        }
    }

    /// Configured steps; a non-finite value falls back to its default.
    pub fn fluctuation(&self) -> Fluctuation {
        let defaults = Fluctuation::default();
        Fluctuation {
            pressure_step: finite_or(self.pressure_step, defaults.pressure_step).abs(),
            temperature_step: finite_or(self.temperature_step, defaults.temperature_step).abs(),
        }
    }

    pub fn evaluator(&self) -> AlertEvaluator {
        AlertEvaluator::new(self.hysteresis_band)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct TopologyConfig {
    pub vehicle_type: VehicleType,
    pub positions: Vec<TirePosition>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct VehiclesConfig {
    #[serde(default)]
    pub vehicles: Vec<Vehicle>,
    #[serde(default)]
    pub assignments: Vec<SensorBinding>,
}

fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        tracing::warn!(value, fallback, "Non-finite fluctuation step, using default");
        fallback
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_refresh_interval_secs() -> f64 {
    DEFAULT_REFRESH_INTERVAL.as_secs_f64()
}

fn default_true() -> bool {
    true
}

fn default_pressure_step() -> f64 {
    Fluctuation::default().pressure_step
}

fn default_temperature_step() -> f64 {
    Fluctuation::default().temperature_step
}

fn default_stream_buffer() -> usize {
    100
}

pub fn load_monitor_config() -> anyhow::Result<MonitorConfig> {
    let builder = config::Config::builder()
        .add_source(config::File::with_name("config/monitor").required(false));
    monitor_config_from(builder)
}

fn monitor_config_from(builder: ConfigBuilder<DefaultState>) -> anyhow::Result<MonitorConfig> {
    let settings = builder
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("Failed to read monitor configuration")?;

    settings
        .try_deserialize()
        .context("Invalid monitor configuration")
}

pub fn load_vehicles_config() -> anyhow::Result<VehiclesConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/vehicles"))
        .build()
        .context("Failed to read vehicle registry configuration")?;

    settings
        .try_deserialize()
        .context("Invalid vehicle registry configuration")
}

/// Built-in topologies with configured layouts layered on top.
pub fn build_topology_table(overrides: &[TopologyConfig]) -> anyhow::Result<TopologyTable> {
    let mut table = TopologyTable::builtin();
    for entry in overrides {
        let topology = VehicleTopology::new(entry.vehicle_type, entry.positions.clone())
            .with_context(|| format!("Invalid topology for {}", entry.vehicle_type))?;
        tracing::info!(
            vehicle_type = %entry.vehicle_type,
            positions = topology.len(),
            "Configured topology registered"
        );
        table.insert(topology);
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::{File, FileFormat};

    const MONITOR_TOML: &str = r#"
[server]
bind_addr = "127.0.0.1:9000"

[monitoring]
refresh_interval_secs = 2.5
hysteresis_band = 1.5

[[topologies]]
vehicle_type = "other"
positions = ["izq", "der"]
"#;

    const VEHICLES_TOML: &str = r#"
[[vehicles]]
id = "vehicle1"
alias = "A01BC2D"
brand = "Mack"
model = "Anthem"
vehicle_type = "camion_gandola"

[[assignments]]
sensor_id = "SENSOR-TPMS-XYZ123"
vehicle_id = "vehicle1"
position = "chuto_del_izq_ext"
"#;

    #[test]
    fn test_monitor_config_defaults() {
        let config = monitor_config_from(config::Config::builder()).unwrap();
        assert_eq!(config.server.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.monitoring, MonitoringSettings::default());
        assert_eq!(config.monitoring.refresh_interval(), Duration::from_secs(5));
        assert!(config.topologies.is_empty());
    }

    #[test]
    fn test_monitor_config_from_toml() {
        let builder = config::Config::builder().add_source(File::from_str(MONITOR_TOML, FileFormat::Toml));
        let config = monitor_config_from(builder).unwrap();

        assert_eq!(config.server.bind_addr, "127.0.0.1:9000");
        assert_eq!(config.monitoring.refresh_interval(), Duration::from_millis(2500));
        assert!(config.monitoring.simulate);
        assert_eq!(config.monitoring.evaluator().hysteresis_band(), 1.5);

        let table = build_topology_table(&config.topologies).unwrap();
        assert_eq!(table.positions_for(VehicleType::Other).unwrap().len(), 2);
    }

    #[test]
    fn test_invalid_interval_falls_back() {
        let settings = MonitoringSettings {
            refresh_interval_secs: 0.0,
            ..MonitoringSettings::default()
        };
        assert_eq!(settings.refresh_interval(), DEFAULT_REFRESH_INTERVAL);
    }

    #[test]
    fn test_non_finite_steps_fall_back() {
        let settings = MonitoringSettings {
            pressure_step: f64::INFINITY,
            temperature_step: f64::NAN,
            ..MonitoringSettings::default()
        };
        assert_eq!(settings.fluctuation(), Fluctuation::default());

        let negative = MonitoringSettings {
            pressure_step: -3.0,
            ..MonitoringSettings::default()
        };
        assert_eq!(negative.fluctuation().pressure_step, 3.0);
    }

    #[test]
    fn test_non_finite_step_from_toml_falls_back() {
        let builder = config::Config::builder().add_source(File::from_str(
            "[monitoring]\npressure_step = inf\ntemperature_step = nan\n",
            FileFormat::Toml,
        ));
        let config = monitor_config_from(builder).unwrap();
        assert_eq!(config.monitoring.fluctuation(), Fluctuation::default());
    }

    #[test]
    fn test_duplicate_configured_positions_rejected() {
        let overrides = vec![TopologyConfig {
            vehicle_type: VehicleType::Other,
            positions: vec![TirePosition::new("izq"), TirePosition::new("izq")],
        }];
        assert!(build_topology_table(&overrides).is_err());
    }

    #[test]
    fn test_vehicles_config_parses() {
        let settings = config::Config::builder()
            .add_source(File::from_str(VEHICLES_TOML, FileFormat::Toml))
            .build()
            .unwrap();
        let config: VehiclesConfig = settings.try_deserialize().unwrap();

        assert_eq!(config.vehicles.len(), 1);
        assert_eq!(config.vehicles[0].display_name(), "A01BC2D (Mack Anthem)");
        assert_eq!(config.assignments[0].position, TirePosition::new("chuto_del_izq_ext"));
    }
}
