use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, error, warn};

use telemetry_core::TelemetryResult;
use telemetry_dispatcher::{Job, JobContext};
use telemetry_domain::{ArrayMetadata, ArrayPatchInfo, ArrayRegistrationInfo, CollectorFactory};

pub const STATUS_CONNECTED: &str = "Connected";

/// `YYYY-MM-DDTHH:MM:SS.mmm` in UTC
const AS_OF_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

/// Checks that a device answers and records its status, model and
/// version on the API server
pub struct MonitorCheckJob {
    pub device: Option<ArrayRegistrationInfo>,
    pub factory: Option<Arc<dyn CollectorFactory>>,
    pub metadata: Option<Arc<dyn ArrayMetadata>>,
}

impl MonitorCheckJob {
    pub fn new(
        device: ArrayRegistrationInfo,
        factory: Arc<dyn CollectorFactory>,
        metadata: Arc<dyn ArrayMetadata>,
    ) -> Self {
        Self {
            device: Some(device),
            factory: Some(factory),
            metadata: Some(metadata),
        }
    }

    async fn probe(
        device: &ArrayRegistrationInfo,
        factory: &dyn CollectorFactory,
    ) -> TelemetryResult<(String, String)> {
        let collector = factory.initialize_collector(device).await?;
        let model = collector.get_array_model().await?;
        let version = collector.get_array_version().await?;
        Ok((model, version))
    }
}

pub fn unable_to_connect_status(error: &impl std::fmt::Display) -> String {
    format!("Unable to connect. Error: {error}")
}

#[async_trait]
impl Job for MonitorCheckJob {
    fn description(&self) -> String {
        match &self.device {
            Some(device) => format!("MonitorCheckJob({})", device.name),
            None => "MonitorCheckJob".to_string(),
        }
    }

    fn device_id(&self) -> Option<String> {
        self.device.as_ref().map(|d| d.id.clone())
    }

    async fn execute(&self, _ctx: &JobContext) {
        let Some(device) = &self.device else {
            error!("Tried to monitor array, but array was nil, stopping");
            return;
        };
        let Some(factory) = &self.factory else {
            error!(device_id = %device.id, "Tried to monitor array, but collector factory was nil, stopping");
            return;
        };
        let Some(metadata) = &self.metadata else {
            error!(device_id = %device.id, "Tried to monitor array, but metadata connection was nil, stopping");
            return;
        };

        let patch = match Self::probe(device, factory.as_ref()).await {
            Ok((model, version)) => {
                debug!(device_id = %device.id, model = %model, version = %version, "Array is reachable");
                ArrayPatchInfo {
                    status: STATUS_CONNECTED.to_string(),
                    model,
                    version,
                    as_of: Utc::now().format(AS_OF_FORMAT).to_string(),
                }
            }
            Err(e) => {
                warn!(device_id = %device.id, error = %e, "Could not connect to array");
                ArrayPatchInfo {
                    status: unable_to_connect_status(&e),
                    ..Default::default()
                }
            }
        };

        if let Err(e) = metadata.patch(&device.id, &patch).await {
            error!(device_id = %device.id, error = %e, "Error patching array status");
        }
    }
}
