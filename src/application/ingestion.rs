// Ingestion adapter - sensor packets into the telemetry store
//
// Replaces the simulated feed with decoded sensor packets. Bad packets are
// counted and dropped one at a time; nothing here can stop monitoring.
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::telemetry_store::SharedTelemetryStore;
use crate::domain::error::MonitorError;
use crate::domain::reading::Reading;
use crate::domain::topology::TirePosition;
use crate::domain::vehicle::SensorBinding;
use crate::infrastructure::chunked_frames::FrameDecoder;

pub const KPA_PER_PSI: f64 = 6.894757;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed packet: {0}")]
    Json(#[from] serde_json::Error),

    #[error("frame of {0} bytes exceeds the frame limit")]
    FrameTooLarge(usize),

    #[error("{0} trailing bytes do not form a complete frame")]
    TruncatedFrame(usize),

    #[error("sensor '{0}' is not assigned to a position on the monitored vehicle")]
    UnboundSensor(String),
}

/// Raw reading as sent by a receptor.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SensorPacket {
    pub sensor_id: String,
    #[serde(default)]
    pub position: Option<TirePosition>,
    /// Receptor id prefix selecting the pressure calibration.
    #[serde(default)]
    pub prefix: Option<String>,
    pub rpsi: f64,
    pub rtemp: f64,
    #[serde(default)]
    pub rvolts: Option<f64>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl SensorPacket {
    pub fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        Ok(serde_json::from_slice(payload)?)
    }

    /// Map the packet to a position and a clamped reading.
    pub fn resolve(&self, bindings: &[SensorBinding]) -> Result<(TirePosition, Reading), DecodeError> {
        let position = match &self.position {
            Some(position) => position.clone(),
            None => bindings
                .iter()
                .find(|b| b.sensor_id == self.sensor_id)
                .map(|b| b.position.clone())
                .ok_or_else(|| DecodeError::UnboundSensor(self.sensor_id.clone()))?,
        };

        let pressure = calibrate_pressure(self.prefix.as_deref(), self.rpsi);
        Ok((position, Reading::clamped(pressure, self.rtemp)))
    }
}

/// Receptor-specific linear calibration to PSI.
///
/// Known prefixes produce kPa, converted here. Anything else already reports PSI.
pub fn calibrate_pressure(prefix: Option<&str>, raw: f64) -> f64 {
    let kpa = match prefix {
        Some(p) if p.starts_with("RPS_A") => 2.8 * raw + 87.20,
        Some(p) if p.starts_with("RPS_B") => 1.572 * raw + 98.428,
        Some(p) if p.starts_with("RPS_C") => 0.688 * raw + 99.312,
        _ => return raw,
    };
    kpa / KPA_PER_PSI
}

#[derive(Debug, Default)]
pub struct IngestionCounters {
    accepted: AtomicU64,
    decode_errors: AtomicU64,
    unknown_positions: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestionStats {
    pub accepted: u64,
    pub decode_errors: u64,
    pub unknown_positions: u64,
}

impl IngestionCounters {
    pub fn stats(&self) -> IngestionStats {
        IngestionStats {
            accepted: self.accepted.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            unknown_positions: self.unknown_positions.load(Ordering::Relaxed),
        }
    }
}

enum Outcome {
    Accepted,
    DecodeError,
    UnknownPosition,
}

#[derive(Clone)]
pub struct IngestionAdapter {
    store: SharedTelemetryStore,
    counters: Arc<IngestionCounters>,
}

impl IngestionAdapter {
    pub fn new(store: SharedTelemetryStore) -> Self {
        Self {
            store,
            counters: Arc::new(IngestionCounters::default()),
        }
    }

    /// Lifetime totals across every ingested batch.
    pub fn stats(&self) -> IngestionStats {
        self.counters.stats()
    }

    /// Decode and apply a single packet payload.
    pub async fn ingest_packet(&self, payload: &[u8], bindings: &[SensorBinding]) -> IngestionStats {
        let mut batch = IngestionStats::default();
        let outcome = self.apply_payload(payload, bindings).await;
        self.record(&mut batch, outcome);
        batch
    }

    /// Apply every frame in `body`. Returns the counts for this batch only.
    pub async fn ingest_frames(&self, body: &[u8], bindings: &[SensorBinding]) -> IngestionStats {
        let mut batch = IngestionStats::default();
        let mut decoder = FrameDecoder::new();
        decoder.push(body);

        loop {
            match decoder.next_frame() {
                Ok(Some(frame)) => {
                    let outcome = self.apply_payload(&frame, bindings).await;
                    self.record(&mut batch, outcome);
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(error = %e, "Dropping undecodable frame");
                    self.record(&mut batch, Outcome::DecodeError);
                }
            }
        }

        let trailing = decoder.remaining();
        if trailing > 0 {
            tracing::warn!(error = %DecodeError::TruncatedFrame(trailing), "Dropping partial frame");
            self.record(&mut batch, Outcome::DecodeError);
        }

        batch
    }

    async fn apply_payload(&self, payload: &[u8], bindings: &[SensorBinding]) -> Outcome {
        let resolved = SensorPacket::decode(payload).and_then(|packet| {
            let resolved = packet.resolve(bindings)?;
            Ok((packet, resolved))
        });

        let (packet, (position, reading)) = match resolved {
            Ok(decoded) => decoded,
            Err(e) => {
                tracing::warn!(error = %e, "Dropping sensor packet");
                return Outcome::DecodeError;
            }
        };

        match self.store.update(&position, reading).await {
            Ok(()) => {
                tracing::debug!(
                    sensor_id = %packet.sensor_id,
                    position = %position,
                    pressure = reading.pressure,
                    temperature = reading.temperature,
                    "Sensor reading applied"
                );
                Outcome::Accepted
            }
            Err(MonitorError::UnknownPosition(p)) => {
                tracing::warn!(sensor_id = %packet.sensor_id, position = %p, "Dropping reading for unknown position");
                Outcome::UnknownPosition
            }
            Err(e) => {
                tracing::warn!(sensor_id = %packet.sensor_id, error = %e, "Dropping sensor reading");
                Outcome::DecodeError
            }
        }
    }

    fn record(&self, batch: &mut IngestionStats, outcome: Outcome) {
        let (slot, counter) = match outcome {
            Outcome::Accepted => (&mut batch.accepted, &self.counters.accepted),
            Outcome::DecodeError => (&mut batch.decode_errors, &self.counters.decode_errors),
            Outcome::UnknownPosition => (&mut batch.unknown_positions, &self.counters.unknown_positions),
        };
        *slot += 1;
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::topology::{TopologyTable, VehicleType};
    use crate::infrastructure::chunked_frames::encode_frame;

    fn bindings() -> Vec<SensorBinding> {
        vec![SensorBinding {
            sensor_id: "SENSOR-TPMS-XYZ123".to_string(),
            vehicle_id: "vehicle1".to_string(),
            position: TirePosition::new("del_izq"),
        }]
    }

    async fn pickup_store() -> SharedTelemetryStore {
        let store = SharedTelemetryStore::new();
        let table = TopologyTable::builtin();
        store
            .select("vehicle1", table.topology_for(VehicleType::Pickup).unwrap())
            .await;
        store
    }

    #[test]
    fn test_uncalibrated_pressure_passes_through() {
        assert_eq!(calibrate_pressure(None, 101.0), 101.0);
        assert_eq!(calibrate_pressure(Some("RX_UNKNOWN"), 101.0), 101.0);
    }

    #[test]
    fn test_calibrated_pressure_converts_kpa() {
        let psi = calibrate_pressure(Some("RPS_A_0042"), 100.0);
        assert!((psi - (2.8 * 100.0 + 87.20) / KPA_PER_PSI).abs() < 1e-9);
    }

    #[test]
    fn test_resolve_uses_binding_when_position_missing() {
        let packet = SensorPacket::decode(br#"{"sensor_id":"SENSOR-TPMS-XYZ123","rpsi":36.5,"rtemp":27.0}"#).unwrap();
        let (position, reading) = packet.resolve(&bindings()).unwrap();
        assert_eq!(position, TirePosition::new("del_izq"));
        assert_eq!(reading, Reading::new(36.5, 27.0));
    }

    #[test]
    fn test_resolve_prefers_explicit_position() {
        let packet = SensorPacket::decode(
            br#"{"sensor_id":"SENSOR-TPMS-XYZ123","position":"tra_der","rpsi":36.5,"rtemp":27.0,"timestamp":"2025-05-01T10:00:00Z"}"#,
        )
        .unwrap();
        let (position, _) = packet.resolve(&bindings()).unwrap();
        assert_eq!(position, TirePosition::new("tra_der"));
        assert!(packet.timestamp.is_some());
    }

    #[test]
    fn test_resolve_clamps_out_of_envelope_values() {
        let packet = SensorPacket::decode(br#"{"sensor_id":"SENSOR-TPMS-XYZ123","rpsi":400.0,"rtemp":-40.0}"#).unwrap();
        let (_, reading) = packet.resolve(&bindings()).unwrap();
        assert_eq!(reading, Reading::new(125.0, 15.0));
    }

    #[test]
    fn test_unbound_sensor_is_rejected() {
        let packet = SensorPacket::decode(br#"{"sensor_id":"SENSOR-TPMS-ABC789","rpsi":36.5,"rtemp":27.0}"#).unwrap();
        assert!(matches!(packet.resolve(&bindings()), Err(DecodeError::UnboundSensor(_))));
    }

    #[tokio::test]
    async fn test_ingest_frames_counts_each_outcome() {
        let store = pickup_store().await;
        let adapter = IngestionAdapter::new(store.clone());

        let mut body = Vec::new();
        body.extend_from_slice(&encode_frame(br#"{"sensor_id":"SENSOR-TPMS-XYZ123","rpsi":31.0,"rtemp":20.0}"#));
        body.extend_from_slice(&encode_frame(b"not json"));
        body.extend_from_slice(&encode_frame(br#"{"sensor_id":"s9","position":"batea_e1_izq_ext","rpsi":90.0,"rtemp":30.0}"#));
        body.extend_from_slice(&encode_frame(br#"{"sensor_id":"s9","rpsi":90.0,"rtemp":30.0}"#));
        body.extend_from_slice(&[0, 0, 0]);

        let batch = adapter.ingest_frames(&body, &bindings()).await;
        assert_eq!(
            batch,
            IngestionStats {
                accepted: 1,
                decode_errors: 3,
                unknown_positions: 1,
            }
        );
        assert_eq!(adapter.stats(), batch);

        let snapshot = store.snapshot().await;
        assert_eq!(snapshot.get(&TirePosition::new("del_izq")), Some(&Reading::new(31.0, 20.0)));
        assert_eq!(snapshot.len(), 4);
    }

    #[tokio::test]
    async fn test_ingest_without_selection_drops_packet() {
        let adapter = IngestionAdapter::new(SharedTelemetryStore::new());
        let batch = adapter
            .ingest_packet(br#"{"sensor_id":"SENSOR-TPMS-XYZ123","rpsi":31.0,"rtemp":20.0}"#, &bindings())
            .await;
        assert_eq!(batch.unknown_positions, 1);
        assert_eq!(batch.accepted, 0);
    }
}
