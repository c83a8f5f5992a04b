use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error};

use telemetry_core::{TelemetryError, TelemetryResult};
use telemetry_domain::{
    ArrayCollector, ArrayMetadata, ArrayRegistrationInfo, CollectorFactory, DeviceType,
};

use crate::device::DeviceClientSettings;
use crate::flasharray::{FlashArrayClient, FlashArrayCollector};
use crate::flashblade::{FlashBladeClient, FlashBladeCollector};

/// Builds REST collectors. Connecting includes API version negotiation,
/// so an unreachable device fails here.
pub struct RestCollectorFactory {
    metadata: Arc<dyn ArrayMetadata>,
    settings: DeviceClientSettings,
}

impl RestCollectorFactory {
    pub fn new(metadata: Arc<dyn ArrayMetadata>, settings: DeviceClientSettings) -> Self {
        Self { metadata, settings }
    }
}

#[async_trait]
impl CollectorFactory for RestCollectorFactory {
    async fn initialize_collector(
        &self,
        info: &ArrayRegistrationInfo,
    ) -> TelemetryResult<Arc<dyn ArrayCollector>> {
        debug!(device_id = %info.id, device_type = %info.device_type, "Initializing collector");

        match &info.device_type {
            DeviceType::FlashArray => {
                let client = FlashArrayClient::connect(
                    &info.name,
                    &info.mgmt_endpoint,
                    &info.api_token,
                    &self.settings,
                )
                .await
                .inspect_err(|e| {
                    error!(device_id = %info.id, error = %e, "Could not create FlashArray Client")
                })?;
                Ok(Arc::new(FlashArrayCollector::new(
                    &info.id,
                    &info.name,
                    &info.mgmt_endpoint,
                    Arc::new(client),
                    Arc::clone(&self.metadata),
                )))
            }
            DeviceType::FlashBlade => {
                let client = FlashBladeClient::connect(
                    &info.name,
                    &info.mgmt_endpoint,
                    &info.api_token,
                    &self.settings,
                )
                .await
                .inspect_err(|e| {
                    error!(device_id = %info.id, error = %e, "Could not create FlashBlade Client")
                })?;
                Ok(Arc::new(FlashBladeCollector::new(
                    &info.id,
                    &info.name,
                    &info.mgmt_endpoint,
                    Arc::new(client),
                    Arc::clone(&self.metadata),
                )))
            }
            DeviceType::Other(tag) => Err(TelemetryError::UnknownDeviceType(tag.clone())),
        }
    }
}
