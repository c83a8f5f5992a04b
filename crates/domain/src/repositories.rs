//! 领域仓储抽象
//!
//! 指标存储、阵列元数据与阵列发现的数据访问接口

use std::collections::HashMap;

use async_trait::async_trait;
use telemetry_core::TelemetryResult;

use crate::entities::{Alert, ArrayMetric, ArrayPatchInfo, ArrayRegistrationInfo, VolumeMetric};

/// Time-series store for metrics, alerts and logs.
///
/// Retention operations delete data older than `max_age_days` and mark
/// day-old retained data read-only.
#[async_trait]
pub trait MetricsStore: Send + Sync {
    async fn add_array_metrics(&self, metrics: &[ArrayMetric]) -> TelemetryResult<()>;
    async fn add_volume_metrics(&self, metrics: &[VolumeMetric]) -> TelemetryResult<()>;
    /// Upsert by `{array_id}-alert-{alert_id}`
    async fn update_alerts(&self, alerts: &[Alert]) -> TelemetryResult<()>;

    async fn clean_array_metrics(&self, max_age_days: u32) -> TelemetryResult<()>;
    async fn clean_volume_metrics(&self, max_age_days: u32) -> TelemetryResult<()>;
    /// Deletes alerts by created date
    async fn clean_alerts(&self, max_age_days: u32) -> TelemetryResult<()>;
    async fn clean_error_logs(&self, max_age_days: u32) -> TelemetryResult<()>;
    async fn clean_timer_logs(&self, max_age_days: u32) -> TelemetryResult<()>;
}

/// 阵列元数据仓储
#[async_trait]
pub trait ArrayMetadata: Send + Sync {
    async fn patch(&self, array_id: &str, patch: &ArrayPatchInfo) -> TelemetryResult<()>;
    async fn get_tags(&self, array_id: &str) -> TelemetryResult<HashMap<String, String>>;
}

/// 阵列发现
#[async_trait]
pub trait ArrayDiscovery: Send + Sync {
    async fn get_arrays(&self) -> TelemetryResult<Vec<ArrayRegistrationInfo>>;
}
