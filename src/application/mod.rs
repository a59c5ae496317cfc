// Application layer - Use cases and the seams to external collaborators
pub mod dashboard_service;
pub mod ingestion;
pub mod monitoring_service;
pub mod refresh_engine;
pub mod streaming_service;
pub mod telemetry_store;
pub mod vehicle_registry;
