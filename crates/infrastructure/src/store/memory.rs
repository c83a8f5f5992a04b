use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info};

use telemetry_core::{TelemetryError, TelemetryResult};
use telemetry_domain::{Alert, ArrayMetric, MetricsStore, VolumeMetric};

use super::retention::{
    alert_cutoff, plan_retention, today_index, ARRAY_METRICS_PREFIX, ERROR_LOG_PREFIX,
    TIMER_LOG_PREFIX, VOLUME_METRICS_PREFIX,
};
use super::{storable_alerts, system_clock, Clock};

#[derive(Debug, Default)]
struct MemoryState {
    indices: BTreeMap<String, Vec<serde_json::Value>>,
    read_only: HashSet<String>,
    alerts: HashMap<String, Alert>,
}

/// Index-per-day store held in memory
pub struct InMemoryMetricsStore {
    state: RwLock<MemoryState>,
    clock: Clock,
}

impl Default for InMemoryMetricsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryMetricsStore {
    pub fn new() -> Self {
        Self::with_clock(system_clock())
    }

    pub fn with_clock(clock: Clock) -> Self {
        Self {
            state: RwLock::new(MemoryState::default()),
            clock,
        }
    }

    /// Create an empty index if it does not exist yet
    pub async fn create_index(&self, name: &str) {
        self.state
            .write()
            .await
            .indices
            .entry(name.to_string())
            .or_default();
    }

    pub async fn index_names(&self) -> Vec<String> {
        self.state.read().await.indices.keys().cloned().collect()
    }

    pub async fn documents(&self, index: &str) -> Vec<serde_json::Value> {
        self.state
            .read()
            .await
            .indices
            .get(index)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn is_read_only(&self, index: &str) -> bool {
        self.state.read().await.read_only.contains(index)
    }

    /// Stored alerts ordered by key
    pub async fn alerts(&self) -> Vec<Alert> {
        let state = self.state.read().await;
        let mut alerts: Vec<Alert> = state.alerts.values().cloned().collect();
        alerts.sort_by_key(|a| a.store_key());
        alerts
    }

    async fn write_documents<T: Serialize>(
        &self,
        prefix: &str,
        documents: &[T],
    ) -> TelemetryResult<()> {
        if documents.is_empty() {
            return Ok(());
        }
        let index = today_index(prefix, (self.clock)());
        let values = documents
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;

        let mut state = self.state.write().await;
        if state.read_only.contains(&index) {
            return Err(TelemetryError::ReadOnlyIndex(index));
        }
        state.indices.entry(index.clone()).or_default().extend(values);
        debug!(index = %index, count = documents.len(), "Stored documents");
        Ok(())
    }

    async fn apply_retention(&self, prefix: &str, max_age_days: u32) -> TelemetryResult<()> {
        let now = (self.clock)();
        let mut state = self.state.write().await;
        let plan = plan_retention(
            state.indices.keys().map(String::as_str),
            prefix,
            now,
            max_age_days,
        );

        for index in plan.delete {
            info!(index = %index, "Deleting index past retention");
            state.indices.remove(&index);
            state.read_only.remove(&index);
        }
        for index in plan.read_only {
            if state.read_only.insert(index.clone()) {
                info!(index = %index, "Marked index read-only");
            }
        }
        Ok(())
    }
}

#[async_trait]
impl MetricsStore for InMemoryMetricsStore {
    async fn add_array_metrics(&self, metrics: &[ArrayMetric]) -> TelemetryResult<()> {
        self.write_documents(ARRAY_METRICS_PREFIX, metrics).await
    }

    async fn add_volume_metrics(&self, metrics: &[VolumeMetric]) -> TelemetryResult<()> {
        self.write_documents(VOLUME_METRICS_PREFIX, metrics).await
    }

    async fn update_alerts(&self, alerts: &[Alert]) -> TelemetryResult<()> {
        let mut state = self.state.write().await;
        for alert in storable_alerts(alerts) {
            state.alerts.insert(alert.store_key(), alert.clone());
        }
        Ok(())
    }

    async fn clean_array_metrics(&self, max_age_days: u32) -> TelemetryResult<()> {
        self.apply_retention(ARRAY_METRICS_PREFIX, max_age_days)
            .await
    }

    async fn clean_volume_metrics(&self, max_age_days: u32) -> TelemetryResult<()> {
        self.apply_retention(VOLUME_METRICS_PREFIX, max_age_days)
            .await
    }

    async fn clean_alerts(&self, max_age_days: u32) -> TelemetryResult<()> {
        let cutoff = alert_cutoff((self.clock)(), max_age_days);
        let mut state = self.state.write().await;
        let before = state.alerts.len();
        state.alerts.retain(|_, alert| alert.created >= cutoff);
        info!(
            removed = before - state.alerts.len(),
            "Deleted alerts past retention"
        );
        Ok(())
    }

    async fn clean_error_logs(&self, max_age_days: u32) -> TelemetryResult<()> {
        self.apply_retention(ERROR_LOG_PREFIX, max_age_days).await
    }

    async fn clean_timer_logs(&self, max_age_days: u32) -> TelemetryResult<()> {
        self.apply_retention(TIMER_LOG_PREFIX, max_age_days).await
    }
}
