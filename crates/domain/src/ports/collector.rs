use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use telemetry_core::TelemetryResult;

use crate::entities::{AllArrayData, AllVolumeData, ArrayRegistrationInfo, DeviceType};

/// Per-device adapter that fans out device calls and merges them into
/// unified records. One instance is built per job execution.
#[async_trait]
pub trait ArrayCollector: Send + Sync {
    async fn get_all_array_data(&self) -> TelemetryResult<AllArrayData>;
    /// `time_window` is the look-back in seconds for time-series sources
    async fn get_all_volume_data(&self, time_window: i64) -> TelemetryResult<AllVolumeData>;
    fn array_id(&self) -> &str;
    async fn get_array_model(&self) -> TelemetryResult<String>;
    async fn get_array_name(&self) -> TelemetryResult<String>;
    async fn get_array_tags(&self) -> TelemetryResult<HashMap<String, String>>;
    fn array_type(&self) -> DeviceType;
    async fn get_array_version(&self) -> TelemetryResult<String>;
    fn display_name(&self) -> &str;
}

/// Builds the collector matching a registration's device type
#[async_trait]
pub trait CollectorFactory: Send + Sync {
    async fn initialize_collector(
        &self,
        info: &ArrayRegistrationInfo,
    ) -> TelemetryResult<Arc<dyn ArrayCollector>>;
}
