use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use telemetry_core::{TelemetryError, TelemetryResult};
use telemetry_domain::{ArrayDiscovery, ArrayMetadata, ArrayPatchInfo, ArrayRegistrationInfo};

#[derive(Debug, Default)]
struct MetadataState {
    arrays: Vec<ArrayRegistrationInfo>,
    tags: HashMap<String, HashMap<String, String>>,
    patches: Vec<(String, ArrayPatchInfo)>,
    tag_lookups: usize,
    fail_discovery: bool,
    fail_tags: bool,
    fail_patch: bool,
}

/// Fleet registry held in memory, with switchable failures
#[derive(Debug, Default)]
pub struct InMemoryMetadata {
    state: Mutex<MetadataState>,
}

impl InMemoryMetadata {
    pub fn new(arrays: Vec<ArrayRegistrationInfo>) -> Self {
        Self {
            state: Mutex::new(MetadataState {
                arrays,
                ..Default::default()
            }),
        }
    }

    pub fn with_tags(mut self, array_id: &str, tags: HashMap<String, String>) -> Self {
        self.state.get_mut().tags.insert(array_id.to_string(), tags);
        self
    }

    pub fn failing_discovery(mut self) -> Self {
        self.state.get_mut().fail_discovery = true;
        self
    }

    pub fn failing_tags(mut self) -> Self {
        self.state.get_mut().fail_tags = true;
        self
    }

    pub fn failing_patch(mut self) -> Self {
        self.state.get_mut().fail_patch = true;
        self
    }

    /// Every patch received, in order
    pub async fn patches(&self) -> Vec<(String, ArrayPatchInfo)> {
        self.state.lock().await.patches.clone()
    }

    pub async fn tag_lookups(&self) -> usize {
        self.state.lock().await.tag_lookups
    }
}

#[async_trait]
impl ArrayDiscovery for InMemoryMetadata {
    async fn get_arrays(&self) -> TelemetryResult<Vec<ArrayRegistrationInfo>> {
        let state = self.state.lock().await;
        if state.fail_discovery {
            return Err(TelemetryError::Metadata("discovery unavailable".to_string()));
        }
        Ok(state.arrays.clone())
    }
}

#[async_trait]
impl ArrayMetadata for InMemoryMetadata {
    async fn patch(&self, array_id: &str, patch: &ArrayPatchInfo) -> TelemetryResult<()> {
        let mut state = self.state.lock().await;
        if state.fail_patch {
            return Err(TelemetryError::Metadata("patch rejected".to_string()));
        }
        state.patches.push((array_id.to_string(), patch.clone()));
        Ok(())
    }

    async fn get_tags(&self, array_id: &str) -> TelemetryResult<HashMap<String, String>> {
        let mut state = self.state.lock().await;
        state.tag_lookups += 1;
        if state.fail_tags {
            return Err(TelemetryError::Metadata("tags unavailable".to_string()));
        }
        Ok(state.tags.get(array_id).cloned().unwrap_or_default())
    }
}
