// Application state for HTTP handlers
use crate::application::monitoring_service::MonitoringService;
use crate::application::streaming_service::StreamingDashboardService;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub monitoring: Arc<MonitoringService>,
    pub streaming_service: StreamingDashboardService,
}

impl AppState {
    pub fn new(monitoring: Arc<MonitoringService>) -> Self {
        Self {
            streaming_service: StreamingDashboardService::new(monitoring.clone()),
            monitoring,
        }
    }
}
