// Router shared by the binary and the handler tests
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    get_dashboard, get_topology, health_check, ingest_packets, list_vehicles, select_vehicle,
    stop_monitoring, stream_dashboard,
};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

// Compression is handled by the response builders, so no CompressionLayer here.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/vehicles", get(list_vehicles))
        .route("/topologies/:vehicle_type", get(get_topology))
        .route("/monitoring", get(get_dashboard).delete(stop_monitoring))
        .route("/monitoring/stream", get(stream_dashboard))
        .route("/monitoring/:vehicle_id", post(select_vehicle))
        .route("/ingest", post(ingest_packets))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
