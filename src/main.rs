// Main entry point - Dependency injection and server setup
mod domain;
mod application;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use crate::application::monitoring_service::MonitoringService;
use crate::infrastructure::config::{build_topology_table, load_monitor_config, load_vehicles_config};
use crate::infrastructure::static_registry::StaticVehicleRegistry;
use crate::presentation::app_state::AppState;
use crate::presentation::router::build_router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let monitor_config = load_monitor_config()?;
    let vehicles_config = load_vehicles_config()?;

    // Registry and topologies (infrastructure layer)
    let topologies = Arc::new(build_topology_table(&monitor_config.topologies)?);
    let registry = Arc::new(StaticVehicleRegistry::from_config(vehicles_config)?);

    // Services (application layer)
    let monitoring = Arc::new(MonitoringService::new(
        registry,
        topologies,
        monitor_config.monitoring.clone(),
    ));
    let state = Arc::new(AppState::new(monitoring));

    // Router (presentation layer)
    let router = build_router(state);

    let addr: SocketAddr = monitor_config
        .server
        .bind_addr
        .parse()
        .with_context(|| format!("Invalid bind address '{}'", monitor_config.server.bind_addr))?;
    tracing::info!(
        %addr,
        refresh_interval_secs = monitor_config.monitoring.refresh_interval().as_secs_f64(),
        simulate = monitor_config.monitoring.simulate,
        "Starting tire-telemetry service"
    );

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
