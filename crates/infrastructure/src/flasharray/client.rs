use async_trait::async_trait;
use serde::de::IgnoredAny;
use tracing::{info, warn};

use telemetry_core::TelemetryResult;

use super::types::*;
use crate::device::{first_item, DeviceClient, DeviceClientSettings, FLASH_ARRAY};

/// Raw FlashArray REST calls the collector builds on
#[async_trait]
pub trait FlashArrayApi: Send + Sync {
    async fn get_alerts_flagged(&self) -> TelemetryResult<Vec<AlertResponse>>;
    async fn get_alerts_timeline(&self) -> TelemetryResult<Vec<AlertResponse>>;
    async fn get_array_capacity_metrics(&self) -> TelemetryResult<ArrayCapacityMetricsResponse>;
    async fn get_array_info(&self) -> TelemetryResult<ArrayInfoResponse>;
    async fn get_array_performance_metrics(
        &self,
    ) -> TelemetryResult<ArrayPerformanceMetricsResponse>;
    async fn get_host_count(&self) -> TelemetryResult<u32>;
    /// Model of the primary controller, or of the first one listed
    async fn get_model(&self) -> TelemetryResult<String>;
    async fn get_volume_capacity_metrics(
        &self,
    ) -> TelemetryResult<Vec<VolumeCapacityMetricsResponse>>;
    async fn get_volume_count(&self) -> TelemetryResult<u32>;
    async fn get_volume_performance_metrics(
        &self,
    ) -> TelemetryResult<Vec<VolumePerformanceMetricsResponse>>;
    async fn get_volume_pending_eradication_count(&self) -> TelemetryResult<u32>;
    async fn get_volume_snapshot_count(&self) -> TelemetryResult<u32>;
    async fn get_volume_snapshots(&self) -> TelemetryResult<Vec<VolumeSnapshotResponse>>;
}

pub struct FlashArrayClient {
    device: DeviceClient,
}

impl FlashArrayClient {
    pub async fn connect(
        display_name: &str,
        mgmt_endpoint: &str,
        api_token: &str,
        settings: &DeviceClientSettings,
    ) -> TelemetryResult<Self> {
        let device =
            DeviceClient::connect(FLASH_ARRAY, display_name, mgmt_endpoint, api_token, settings)
                .await?;
        info!(
            display_name,
            api_version = device.api_version(),
            "Successfully created FlashArray Client"
        );
        Ok(Self { device })
    }

    pub fn api_version(&self) -> &str {
        self.device.api_version()
    }

    async fn get_list<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
    ) -> TelemetryResult<Vec<T>> {
        Ok(self.device.get::<Vec<T>>(endpoint).await?.body)
    }

    async fn get_first<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
    ) -> TelemetryResult<T> {
        first_item(self.get_list(endpoint).await?, endpoint)
    }

    async fn get_count(&self, endpoint: &str) -> TelemetryResult<u32> {
        let response = self.device.get::<IgnoredAny>(endpoint).await?;
        response.total_item_count().inspect_err(|e| {
            warn!(
                display_name = self.device.display_name(),
                endpoint,
                error = %e,
                "Could not get total item count from header"
            );
        })
    }
}

#[async_trait]
impl FlashArrayApi for FlashArrayClient {
    async fn get_alerts_flagged(&self) -> TelemetryResult<Vec<AlertResponse>> {
        self.get_list("/message?flagged=true").await
    }

    async fn get_alerts_timeline(&self) -> TelemetryResult<Vec<AlertResponse>> {
        self.get_list("/message?timeline=true").await
    }

    async fn get_array_capacity_metrics(&self) -> TelemetryResult<ArrayCapacityMetricsResponse> {
        self.get_first("/array?space=true").await
    }

    async fn get_array_info(&self) -> TelemetryResult<ArrayInfoResponse> {
        Ok(self.device.get::<ArrayInfoResponse>("/array").await?.body)
    }

    async fn get_array_performance_metrics(
        &self,
    ) -> TelemetryResult<ArrayPerformanceMetricsResponse> {
        self.get_first("/array?action=monitor&size=true").await
    }

    async fn get_host_count(&self) -> TelemetryResult<u32> {
        self.get_count("/host?start=0&limit=1").await
    }

    async fn get_model(&self) -> TelemetryResult<String> {
        let endpoint = "/array?controllers=true";
        let controllers: Vec<ControllerResponse> = self.get_list(endpoint).await?;

        if let Some(primary) = controllers.iter().find(|c| c.mode == "primary") {
            return Ok(primary.model.clone());
        }
        warn!(
            display_name = self.device.display_name(),
            "No primary controller found"
        );
        Ok(first_item(controllers, endpoint)?.model)
    }

    async fn get_volume_capacity_metrics(
        &self,
    ) -> TelemetryResult<Vec<VolumeCapacityMetricsResponse>> {
        self.get_list("/volume?space=true").await
    }

    async fn get_volume_count(&self) -> TelemetryResult<u32> {
        self.get_count("/volume?start=0&limit=1").await
    }

    async fn get_volume_performance_metrics(
        &self,
    ) -> TelemetryResult<Vec<VolumePerformanceMetricsResponse>> {
        self.get_list("/volume?action=monitor").await
    }

    async fn get_volume_pending_eradication_count(&self) -> TelemetryResult<u32> {
        self.get_count("/volume?pending_only=true&start=0&limit=1")
            .await
    }

    async fn get_volume_snapshot_count(&self) -> TelemetryResult<u32> {
        self.get_count("/volume?snap=true&start=0&limit=1").await
    }

    async fn get_volume_snapshots(&self) -> TelemetryResult<Vec<VolumeSnapshotResponse>> {
        self.get_list("/volume?snap=true").await
    }
}
