use std::sync::Arc;

use async_trait::async_trait;
use metrics::counter;
use tracing::{debug, error, trace};

use telemetry_dispatcher::{Job, JobContext};
use telemetry_domain::{Alert, ArrayMetric, MetricsStore, VolumeMetric};

/// Writes array metrics into the store
pub struct ArrayMetricPushJob {
    pub metrics: Option<Vec<ArrayMetric>>,
    pub store: Option<Arc<dyn MetricsStore>>,
}

impl ArrayMetricPushJob {
    pub fn new(metrics: Vec<ArrayMetric>, store: Arc<dyn MetricsStore>) -> Self {
        Self {
            metrics: Some(metrics),
            store: Some(store),
        }
    }
}

#[async_trait]
impl Job for ArrayMetricPushJob {
    fn description(&self) -> String {
        "ArrayMetricPushJob".to_string()
    }

    fn device_id(&self) -> Option<String> {
        self.metrics
            .as_ref()
            .and_then(|m| m.first())
            .map(|m| m.array_id.clone())
    }

    async fn execute(&self, _ctx: &JobContext) {
        let Some(metrics) = &self.metrics else {
            trace!("No array metrics to push, stopping");
            return;
        };
        let Some(store) = &self.store else {
            error!("Tried to push array metrics, but database was nil, stopping");
            return;
        };

        match store.add_array_metrics(metrics).await {
            Ok(()) => {
                debug!(count = metrics.len(), "Pushed array metrics");
                counter!("telemetry_store_writes_total", "kind" => "array_metrics").increment(1);
            }
            Err(e) => {
                error!(error = %e, "Error pushing array metrics to database");
                counter!("telemetry_store_write_failures_total", "kind" => "array_metrics")
                    .increment(1);
            }
        }
    }
}

/// Writes volume or file-system metrics into the store
pub struct ArrayVolumeMetricPushJob {
    pub metrics: Option<Vec<VolumeMetric>>,
    pub store: Option<Arc<dyn MetricsStore>>,
}

impl ArrayVolumeMetricPushJob {
    pub fn new(metrics: Vec<VolumeMetric>, store: Arc<dyn MetricsStore>) -> Self {
        Self {
            metrics: Some(metrics),
            store: Some(store),
        }
    }
}

#[async_trait]
impl Job for ArrayVolumeMetricPushJob {
    fn description(&self) -> String {
        "ArrayVolumeMetricPushJob".to_string()
    }

    fn device_id(&self) -> Option<String> {
        self.metrics
            .as_ref()
            .and_then(|m| m.first())
            .map(|m| m.array_id.clone())
    }

    async fn execute(&self, _ctx: &JobContext) {
        let Some(metrics) = &self.metrics else {
            trace!("No volume metrics to push, stopping");
            return;
        };
        let Some(store) = &self.store else {
            error!("Tried to push volume metrics, but database was nil, stopping");
            return;
        };

        match store.add_volume_metrics(metrics).await {
            Ok(()) => {
                debug!(count = metrics.len(), "Pushed volume metrics");
                counter!("telemetry_store_writes_total", "kind" => "volume_metrics").increment(1);
            }
            Err(e) => {
                error!(error = %e, "Error pushing volume metrics to database");
                counter!("telemetry_store_write_failures_total", "kind" => "volume_metrics")
                    .increment(1);
            }
        }
    }
}

/// Upserts alerts into the store
pub struct ArrayAlertPushJob {
    pub alerts: Option<Vec<Alert>>,
    pub store: Option<Arc<dyn MetricsStore>>,
}

impl ArrayAlertPushJob {
    pub fn new(alerts: Vec<Alert>, store: Arc<dyn MetricsStore>) -> Self {
        Self {
            alerts: Some(alerts),
            store: Some(store),
        }
    }
}

#[async_trait]
impl Job for ArrayAlertPushJob {
    fn description(&self) -> String {
        "ArrayAlertPushJob".to_string()
    }

    fn device_id(&self) -> Option<String> {
        self.alerts
            .as_ref()
            .and_then(|a| a.first())
            .map(|a| a.array_id.clone())
    }

    async fn execute(&self, _ctx: &JobContext) {
        let Some(alerts) = &self.alerts else {
            trace!("No alerts to push, stopping");
            return;
        };
        let Some(store) = &self.store else {
            error!("Tried to push alerts, but database was nil, stopping");
            return;
        };

        match store.update_alerts(alerts).await {
            Ok(()) => {
                debug!(count = alerts.len(), "Pushed alerts");
                counter!("telemetry_store_writes_total", "kind" => "alerts").increment(1);
            }
            Err(e) => {
                error!(error = %e, "Error pushing alerts to database");
                counter!("telemetry_store_write_failures_total", "kind" => "alerts").increment(1);
            }
        }
    }
}
