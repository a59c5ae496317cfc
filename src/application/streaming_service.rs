// Streaming dashboard service - pushes a fresh dashboard after every store revision
use crate::application::monitoring_service::MonitoringService;
use crate::domain::dashboard::DashboardView;
use crate::domain::error::MonitorError;
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Clone)]
pub struct StreamingDashboardService {
    monitoring: Arc<MonitoringService>,
}

impl StreamingDashboardService {
    pub fn new(monitoring: Arc<MonitoringService>) -> Self {
        Self { monitoring }
    }

    /// Stream dashboards for the current session.
    ///
    /// The stream ends when the client goes away or when the session it was
    /// opened for is stopped or replaced.
    pub async fn stream_dashboard(&self) -> Result<mpsc::Receiver<DashboardView>, MonitorError> {
        let buffer = self.monitoring.settings().stream_buffer.max(1);
        let (tx, rx) = mpsc::channel(buffer);

        // Subscribe before the first build so no revision slips between the two.
        let mut revisions = self.monitoring.store().subscribe();
        let first = self.monitoring.dashboard().await?;
        let epoch = first.epoch;
        revisions.mark_unchanged();

        tracing::debug!(vehicle_id = %first.vehicle_id, epoch, "Dashboard stream opened");
        let _ = tx.send(first).await;

        let monitoring = self.monitoring.clone();
        tokio::spawn(async move {
            let mut sent = 1u64;
            while revisions.changed().await.is_ok() {
                let revision = *revisions.borrow_and_update();
                if revision.epoch != epoch {
                    break;
                }

                let view = match monitoring.dashboard().await {
                    Ok(view) if view.epoch == epoch => view,
                    _ => break,
                };
                if tx.send(view).await.is_err() {
                    break;
                }
                sent += 1;
            }
            tracing::debug!(epoch, sent, "Dashboard stream closed");
        });

        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::monitoring_service::tests::service_with;
    use crate::infrastructure::config::MonitoringSettings;
    use std::time::Duration;

    #[tokio::test]
    async fn test_stream_requires_selection() {
        let streaming = StreamingDashboardService::new(Arc::new(service_with(MonitoringSettings::default())));
        assert_eq!(streaming.stream_dashboard().await.err(), Some(MonitorError::NoVehicleSelected));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_follows_ticks_and_ends_on_stop() {
        let monitoring = Arc::new(service_with(MonitoringSettings::default()));
        monitoring.select("vehicle2").await.unwrap();
        let streaming = StreamingDashboardService::new(monitoring.clone());
        let mut rx = streaming.stream_dashboard().await.unwrap();

        let first = rx.recv().await.unwrap();
        assert_eq!(first.vehicle_id, "vehicle2");

        tokio::time::sleep(Duration::from_secs(6)).await;
        let second = rx.recv().await.unwrap();
        assert_eq!(second.epoch, first.epoch);
        assert_ne!(second.tires, first.tires);

        monitoring.stop().await;
        assert!(rx.recv().await.is_none());
    }
}
