use async_trait::async_trait;
use chrono::Utc;
use serde::de::{DeserializeOwned, IgnoredAny};
use tracing::{info, trace};

use telemetry_core::TelemetryResult;

use super::types::*;
use crate::device::{first_item, DeviceClient, DeviceClientSettings, FLASH_BLADE};

/// Raw FlashBlade REST calls the collector builds on
#[async_trait]
pub trait FlashBladeApi: Send + Sync {
    async fn get_alerts(&self) -> TelemetryResult<Vec<AlertResponse>>;
    async fn get_array_capacity_metrics(&self) -> TelemetryResult<ArrayCapacityMetricsResponse>;
    async fn get_array_info(&self) -> TelemetryResult<ArrayInfoResponse>;
    async fn get_array_performance_metrics(
        &self,
    ) -> TelemetryResult<ArrayPerformanceMetricsResponse>;
    async fn get_file_system_capacity_metrics(
        &self,
    ) -> TelemetryResult<Vec<FileSystemCapacityResponse>>;
    async fn get_file_system_count(&self) -> TelemetryResult<u32>;
    /// Every page of NFS performance samples within the last `time_window` seconds
    async fn get_file_system_performance_metrics(
        &self,
        time_window: i64,
    ) -> TelemetryResult<Vec<FileSystemPerformanceResponse>>;
    async fn get_file_system_snapshot_count(&self) -> TelemetryResult<u32>;
    async fn get_file_system_snapshots(&self) -> TelemetryResult<Vec<FileSystemSnapshotResponse>>;
}

pub struct FlashBladeClient {
    device: DeviceClient,
}

impl FlashBladeClient {
    pub async fn connect(
        display_name: &str,
        mgmt_endpoint: &str,
        api_token: &str,
        settings: &DeviceClientSettings,
    ) -> TelemetryResult<Self> {
        let device =
            DeviceClient::connect(FLASH_BLADE, display_name, mgmt_endpoint, api_token, settings)
                .await?;
        info!(
            display_name,
            api_version = device.api_version(),
            "Successfully created FlashBlade Client"
        );
        Ok(Self { device })
    }

    pub fn api_version(&self) -> &str {
        self.device.api_version()
    }

    async fn get_items<T: DeserializeOwned>(
        &self,
        endpoint: &str,
    ) -> TelemetryResult<ItemsResponse<T>> {
        Ok(self.device.get::<ItemsResponse<T>>(endpoint).await?.body)
    }

    async fn get_first<T: DeserializeOwned>(&self, endpoint: &str) -> TelemetryResult<T> {
        first_item(self.get_items(endpoint).await?.items, endpoint)
    }

    async fn get_count(&self, endpoint: &str) -> TelemetryResult<u32> {
        let response = self.get_items::<IgnoredAny>(endpoint).await?;
        Ok(response.pagination_info.total_item_count)
    }
}

/// First page of the NFS file-system performance query. Times are in
/// milliseconds, truncated to whole seconds.
pub fn file_system_performance_endpoint(now_secs: i64, time_window: i64) -> String {
    let start_time = (now_secs - (time_window + 1)) * 1000;
    let end_time = now_secs * 1000;
    format!(
        "/file-systems/performance?protocol=nfs&limit=5&resolution=30000&start_time={start_time}&end_time={end_time}"
    )
}

#[async_trait]
impl FlashBladeApi for FlashBladeClient {
    async fn get_alerts(&self) -> TelemetryResult<Vec<AlertResponse>> {
        Ok(self.get_items("/alerts").await?.items)
    }

    async fn get_array_capacity_metrics(&self) -> TelemetryResult<ArrayCapacityMetricsResponse> {
        self.get_first("/arrays/space").await
    }

    async fn get_array_info(&self) -> TelemetryResult<ArrayInfoResponse> {
        self.get_first("/arrays").await
    }

    async fn get_array_performance_metrics(
        &self,
    ) -> TelemetryResult<ArrayPerformanceMetricsResponse> {
        self.get_first("/arrays/performance").await
    }

    async fn get_file_system_capacity_metrics(
        &self,
    ) -> TelemetryResult<Vec<FileSystemCapacityResponse>> {
        Ok(self.get_items("/file-systems").await?.items)
    }

    async fn get_file_system_count(&self) -> TelemetryResult<u32> {
        self.get_count("/file-systems?limit=1").await
    }

    async fn get_file_system_performance_metrics(
        &self,
        time_window: i64,
    ) -> TelemetryResult<Vec<FileSystemPerformanceResponse>> {
        let endpoint = file_system_performance_endpoint(Utc::now().timestamp(), time_window);

        let mut page = self
            .get_items::<FileSystemPerformanceResponse>(&endpoint)
            .await?;
        let mut samples = std::mem::take(&mut page.items);

        while let Some(token) = page
            .pagination_info
            .continuation_token
            .take()
            .filter(|token| !token.is_empty())
        {
            trace!(
                display_name = self.device.display_name(),
                token = %token,
                "Following file-system performance continuation token"
            );
            page = self
                .get_items(&format!("{endpoint}&token={token}"))
                .await?;
            samples.append(&mut page.items);
        }

        Ok(samples)
    }

    async fn get_file_system_snapshot_count(&self) -> TelemetryResult<u32> {
        self.get_count("/file-system-snapshots?limit=1").await
    }

    async fn get_file_system_snapshots(&self) -> TelemetryResult<Vec<FileSystemSnapshotResponse>> {
        Ok(self.get_items("/file-system-snapshots").await?.items)
    }
}
