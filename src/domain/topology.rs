// Vehicle topology - which tire positions exist on each vehicle type
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::MonitorError;
use super::reading::Reading;

/// Starting reading for positions that have no registered seed.
pub const DEFAULT_SEED: Reading = Reading {
    pressure: 100.0,
    temperature: 30.0,
};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TirePosition(String);

impl TirePosition {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TirePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VehicleType {
    TractorTrailer,
    RigidTruck,
    Bus,
    Pickup,
    Other,
}

impl VehicleType {
    pub const ALL: [VehicleType; 5] = [
        VehicleType::TractorTrailer,
        VehicleType::RigidTruck,
        VehicleType::Bus,
        VehicleType::Pickup,
        VehicleType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleType::TractorTrailer => "tractor-trailer",
            VehicleType::RigidTruck => "rigid-truck",
            VehicleType::Bus => "bus",
            VehicleType::Pickup => "pickup",
            VehicleType::Other => "other",
        }
    }
}

impl fmt::Display for VehicleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VehicleType {
    type Err = MonitorError;

    /// Accepts the canonical kebab-case tags and the legacy registry tags.
    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "tractor-trailer" | "camion_gandola" => Ok(VehicleType::TractorTrailer),
            "rigid-truck" | "camion_750" => Ok(VehicleType::RigidTruck),
            "bus" | "autobus" => Ok(VehicleType::Bus),
            "pickup" => Ok(VehicleType::Pickup),
            "other" | "otro" => Ok(VehicleType::Other),
            _ => Err(MonitorError::UnknownVehicleType(tag.to_string())),
        }
    }
}

/// Ordered, duplicate-free set of positions for one vehicle type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleTopology {
    pub vehicle_type: VehicleType,
    positions: Vec<TirePosition>,
    #[serde(skip)]
    seeds: HashMap<TirePosition, Reading>,
}

impl VehicleTopology {
    pub fn new(vehicle_type: VehicleType, positions: Vec<TirePosition>) -> Result<Self, MonitorError> {
        let mut seen = HashSet::with_capacity(positions.len());
        for position in &positions {
            if !seen.insert(position) {
                return Err(MonitorError::DuplicatePosition(position.to_string()));
            }
        }

        Ok(Self {
            vehicle_type,
            positions,
            seeds: HashMap::new(),
        })
    }

    fn with_seeds(vehicle_type: VehicleType, layout: &[(&str, f64, f64)]) -> Result<Self, MonitorError> {
        let positions = layout.iter().map(|(key, _, _)| TirePosition::new(*key)).collect();
        let mut topology = Self::new(vehicle_type, positions)?;
        topology.seeds = layout
            .iter()
            .map(|(key, p, t)| (TirePosition::new(*key), Reading::clamped(*p, *t)))
            .collect();
        Ok(topology)
    }

    pub fn positions(&self) -> &[TirePosition] {
        &self.positions
    }

    pub fn contains(&self, position: &TirePosition) -> bool {
        self.positions.contains(position)
    }

    /// Starting reading for a position, always within the physical envelope.
    pub fn seed_for(&self, position: &TirePosition) -> Reading {
        self.seeds.get(position).copied().unwrap_or(DEFAULT_SEED)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

// Tractor (chuto) front and drive axles, then three trailer (batea) axles.
const TRACTOR_TRAILER_LAYOUT: &[(&str, f64, f64)] = &[
    ("chuto_del_izq_ext", 100.0, 28.0),
    ("chuto_del_der_ext", 102.0, 29.0),
    ("chuto_del_izq_int", 101.0, 27.0),
    ("chuto_del_der_int", 99.0, 30.0),
    ("chuto_tra_izq_ext", 105.0, 35.0),
    ("chuto_tra_der_ext", 103.0, 36.0),
    ("chuto_tra_izq_int", 104.0, 34.0),
    ("chuto_tra_der_int", 106.0, 35.0),
    ("batea_e1_izq_ext", 100.0, 33.0),
    ("batea_e1_der_ext", 102.0, 32.0),
    ("batea_e1_izq_int", 101.0, 31.0),
    ("batea_e1_der_int", 99.0, 33.0),
    ("batea_e2_izq_ext", 103.0, 34.0),
    ("batea_e2_der_ext", 100.0, 35.0),
    ("batea_e2_izq_int", 102.0, 32.0),
    ("batea_e2_der_int", 104.0, 34.0),
    ("batea_e3_izq_ext", 98.0, 35.0),
    ("batea_e3_der_ext", 101.0, 36.0),
    ("batea_e3_izq_int", 100.0, 33.0),
    ("batea_e3_der_int", 102.0, 35.0),
];

const RIGID_TRUCK_LAYOUT: &[(&str, f64, f64)] = &[
    ("del_izq", 95.0, 28.0),
    ("del_der", 95.0, 28.0),
    ("tra_izq_ext", 100.0, 32.0),
    ("tra_der_ext", 100.0, 32.0),
    ("tra_izq_int", 100.0, 31.0),
    ("tra_der_int", 100.0, 31.0),
];

const BUS_LAYOUT: &[(&str, f64, f64)] = &[
    ("del_izq", 104.0, 30.0),
    ("del_der", 104.0, 30.0),
    ("tra_izq_ext", 105.0, 34.0),
    ("tra_der_ext", 105.0, 34.0),
    ("tra_izq_int", 105.0, 33.0),
    ("tra_der_int", 105.0, 33.0),
];

const PICKUP_LAYOUT: &[(&str, f64, f64)] = &[
    ("del_izq", 35.0, 25.0),
    ("del_der", 35.0, 25.0),
    ("tra_izq", 38.0, 26.0),
    ("tra_der", 38.0, 26.0),
];

/// Static topology registry, built once at startup and read-only afterwards.
#[derive(Debug, Clone)]
pub struct TopologyTable {
    topologies: HashMap<VehicleType, VehicleTopology>,
}

impl TopologyTable {
    /// Built-in layouts. `Other` has no schematic until one is configured.
    pub fn builtin() -> Self {
        let layouts = [
            (VehicleType::TractorTrailer, TRACTOR_TRAILER_LAYOUT),
            (VehicleType::RigidTruck, RIGID_TRUCK_LAYOUT),
            (VehicleType::Bus, BUS_LAYOUT),
            (VehicleType::Pickup, PICKUP_LAYOUT),
        ];

        let topologies = layouts
            .into_iter()
            .filter_map(|(vehicle_type, layout)| match VehicleTopology::with_seeds(vehicle_type, layout) {
                Ok(topology) => Some((vehicle_type, topology)),
                Err(e) => {
                    tracing::error!(%vehicle_type, error = %e, "Built-in layout rejected");
                    None
                }
            })
            .collect();

        Self { topologies }
    }

    pub fn empty() -> Self {
        Self {
            topologies: HashMap::new(),
        }
    }

    /// Register or replace the topology for its vehicle type.
    pub fn insert(&mut self, topology: VehicleTopology) {
        self.topologies.insert(topology.vehicle_type, topology);
    }

    pub fn topology_for(&self, vehicle_type: VehicleType) -> Result<&VehicleTopology, MonitorError> {
        self.topologies
            .get(&vehicle_type)
            .ok_or_else(|| MonitorError::UnknownVehicleType(vehicle_type.to_string()))
    }

    pub fn positions_for(&self, vehicle_type: VehicleType) -> Result<&[TirePosition], MonitorError> {
        self.topology_for(vehicle_type).map(|t| t.positions())
    }

    /// Resolve a raw registry tag straight to its topology.
    pub fn topology_for_tag(&self, tag: &str) -> Result<&VehicleTopology, MonitorError> {
        let vehicle_type: VehicleType = tag.parse()?;
        self.topology_for(vehicle_type)
    }
}

impl Default for TopologyTable {
    fn default() -> Self {
        Self::builtin()
    }
}
