use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};

use telemetry_dispatcher::{Job, JobContext};
use telemetry_domain::MetricsStore;

/// Removes array and volume metric indices past retention. Stops at the
/// first failure.
pub struct MetricCleanupJob {
    pub store: Option<Arc<dyn MetricsStore>>,
    pub max_age_days: u32,
}

impl MetricCleanupJob {
    pub fn new(store: Arc<dyn MetricsStore>, max_age_days: u32) -> Self {
        Self {
            store: Some(store),
            max_age_days,
        }
    }
}

#[async_trait]
impl Job for MetricCleanupJob {
    fn description(&self) -> String {
        "MetricCleanupJob".to_string()
    }

    async fn execute(&self, _ctx: &JobContext) {
        let Some(store) = &self.store else {
            error!("Tried to clean metrics, but database was nil, stopping");
            return;
        };

        info!(max_age_days = self.max_age_days, "Cleaning array metrics");
        if let Err(e) = store.clean_array_metrics(self.max_age_days).await {
            error!(error = %e, "Error cleaning array metrics, stopping");
            return;
        }

        info!(max_age_days = self.max_age_days, "Cleaning volume metrics");
        if let Err(e) = store.clean_volume_metrics(self.max_age_days).await {
            error!(error = %e, "Error cleaning volume metrics, stopping");
            return;
        }

        info!("Finished cleaning metrics");
    }
}

pub struct AlertCleanupJob {
    pub store: Option<Arc<dyn MetricsStore>>,
    pub max_age_days: u32,
}

impl AlertCleanupJob {
    pub fn new(store: Arc<dyn MetricsStore>, max_age_days: u32) -> Self {
        Self {
            store: Some(store),
            max_age_days,
        }
    }
}

#[async_trait]
impl Job for AlertCleanupJob {
    fn description(&self) -> String {
        "AlertCleanupJob".to_string()
    }

    async fn execute(&self, _ctx: &JobContext) {
        let Some(store) = &self.store else {
            error!("Tried to clean alerts, but database was nil, stopping");
            return;
        };

        info!(max_age_days = self.max_age_days, "Cleaning alerts");
        match store.clean_alerts(self.max_age_days).await {
            Ok(()) => info!("Finished cleaning alerts"),
            Err(e) => error!(error = %e, "Error cleaning alerts"),
        }
    }
}

pub struct ErrorLogCleanupJob {
    pub store: Option<Arc<dyn MetricsStore>>,
    pub max_age_days: u32,
}

impl ErrorLogCleanupJob {
    pub fn new(store: Arc<dyn MetricsStore>, max_age_days: u32) -> Self {
        Self {
            store: Some(store),
            max_age_days,
        }
    }
}

#[async_trait]
impl Job for ErrorLogCleanupJob {
    fn description(&self) -> String {
        "ErrorLogCleanupJob".to_string()
    }

    async fn execute(&self, _ctx: &JobContext) {
        let Some(store) = &self.store else {
            error!("Tried to clean error logs, but database was nil, stopping");
            return;
        };

        info!(max_age_days = self.max_age_days, "Cleaning error logs");
        match store.clean_error_logs(self.max_age_days).await {
            Ok(()) => info!("Finished cleaning error logs"),
            Err(e) => error!(error = %e, "Error cleaning error logs"),
        }
    }
}

pub struct TimerLogCleanupJob {
    pub store: Option<Arc<dyn MetricsStore>>,
    pub max_age_days: u32,
}

impl TimerLogCleanupJob {
    pub fn new(store: Arc<dyn MetricsStore>, max_age_days: u32) -> Self {
        Self {
            store: Some(store),
            max_age_days,
        }
    }
}

#[async_trait]
impl Job for TimerLogCleanupJob {
    fn description(&self) -> String {
        "TimerLogCleanupJob".to_string()
    }

    async fn execute(&self, _ctx: &JobContext) {
        let Some(store) = &self.store else {
            error!("Tried to clean timer logs, but database was nil, stopping");
            return;
        };

        info!(max_age_days = self.max_age_days, "Cleaning timer logs");
        match store.clean_timer_logs(self.max_age_days).await {
            Ok(()) => info!("Finished cleaning timer logs"),
            Err(e) => error!(error = %e, "Error cleaning timer logs"),
        }
    }
}
