// HTTP request handlers
use crate::domain::topology::TirePosition;
use crate::infrastructure::chunked_frames::stream_from_receiver;
use crate::infrastructure::http_response::{accepts_brotli, json_response};
use crate::presentation::app_state::AppState;
use crate::presentation::error::ApiResult;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct VehicleSummary {
    pub id: String,
    pub name: String,
    pub vehicle_type: String,
    pub has_schematic: bool,
}

#[derive(Debug, Serialize)]
pub struct TopologyResponse<'a> {
    pub vehicle_type: String,
    pub positions: &'a [TirePosition],
}

#[derive(Debug, Serialize)]
pub struct StopResponse {
    pub stopped: bool,
}

fn into_response(result: Result<Response, StatusCode>) -> Response {
    match result {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// List registered vehicles and whether a schematic exists for each
pub async fn list_vehicles(headers: HeaderMap, State(state): State<Arc<AppState>>) -> ApiResult<Response> {
    let vehicles = state.monitoring.list_vehicles().await?;
    let topologies = state.monitoring.topologies();

    let summaries: Vec<VehicleSummary> = vehicles
        .into_iter()
        .map(|v| VehicleSummary {
            name: v.display_name(),
            has_schematic: topologies.topology_for_tag(&v.vehicle_type).is_ok(),
            id: v.id,
            vehicle_type: v.vehicle_type,
        })
        .collect();

    Ok(into_response(
        json_response(StatusCode::OK, &summaries, accepts_brotli(&headers)).await,
    ))
}

/// Tire layout for a vehicle type tag
pub async fn get_topology(
    Path(vehicle_type): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Response> {
    let topology = state.monitoring.topologies().topology_for_tag(&vehicle_type)?;
    let body = TopologyResponse {
        vehicle_type: topology.vehicle_type.to_string(),
        positions: topology.positions(),
    };

    Ok(into_response(
        json_response(StatusCode::OK, &body, accepts_brotli(&headers)).await,
    ))
}

/// Select a vehicle for monitoring, replacing any current selection
pub async fn select_vehicle(
    Path(vehicle_id): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Response> {
    let selected = state.monitoring.select(&vehicle_id).await?;
    Ok(into_response(
        json_response(StatusCode::OK, &selected, accepts_brotli(&headers)).await,
    ))
}

/// Stop monitoring the current vehicle
pub async fn stop_monitoring(headers: HeaderMap, State(state): State<Arc<AppState>>) -> Response {
    let stopped = state.monitoring.stop().await;
    into_response(json_response(StatusCode::OK, &StopResponse { stopped }, accepts_brotli(&headers)).await)
}

/// Current dashboard: per-tire readings and levels plus the fleet banner
pub async fn get_dashboard(headers: HeaderMap, State(state): State<Arc<AppState>>) -> ApiResult<Response> {
    let dashboard = state.monitoring.dashboard().await?;
    Ok(into_response(
        json_response(StatusCode::OK, &dashboard, accepts_brotli(&headers)).await,
    ))
}

/// Stream dashboards as length-prefixed JSON frames
pub async fn stream_dashboard(headers: HeaderMap, State(state): State<Arc<AppState>>) -> ApiResult<Response> {
    let compress = accepts_brotli(&headers);
    let rx = state.streaming_service.stream_dashboard().await?;
    Ok(stream_from_receiver(rx, compress).await.into_response())
}

/// Ingest a body of length-prefixed sensor packets
pub async fn ingest_packets(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Response {
    let stats = state.monitoring.ingest(&body).await;
    tracing::debug!(
        accepted = stats.accepted,
        decode_errors = stats.decode_errors,
        unknown_positions = stats.unknown_positions,
        "Ingested sensor batch"
    );
    into_response(json_response(StatusCode::OK, &stats, accepts_brotli(&headers)).await)
}
