use std::collections::HashMap;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, error, warn};

use telemetry_core::{TelemetryError, TelemetryResult};
use telemetry_domain::{ArrayDiscovery, ArrayMetadata, ArrayPatchInfo, ArrayRegistrationInfo};

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    #[serde(default = "Vec::new")]
    response: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct ArrayTags {
    id: String,
    #[serde(default)]
    tags: Vec<Tag>,
}

#[derive(Debug, Deserialize)]
struct Tag {
    #[serde(default)]
    key: String,
    #[serde(default)]
    value: String,
}

/// Client for the fleet API server: device discovery, status patches
/// and tag lookups.
pub struct ApiServerConnection {
    base_url: String,
    http: reqwest::Client,
}

impl ApiServerConnection {
    pub fn new(base_url: &str) -> TelemetryResult<Self> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> TelemetryResult<T> {
        match self.http.get(url).query(query).send().await {
            Ok(response) => {
                if response.status().is_success() {
                    response.json::<T>().await.map_err(|e| {
                        TelemetryError::UnexpectedResponse(format!("{url}: {e}"))
                    })
                } else {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    error!(url, status_code = status.as_u16(), body = %body, "API server request failed");
                    Err(TelemetryError::Metadata(format!(
                        "GET {url} returned {status}"
                    )))
                }
            }
            Err(e) => {
                error!(url, error = %e, "Could not reach API server");
                Err(e.into())
            }
        }
    }
}

#[async_trait]
impl ArrayDiscovery for ApiServerConnection {
    async fn get_arrays(&self) -> TelemetryResult<Vec<ArrayRegistrationInfo>> {
        let url = format!("{}/arrays", self.base_url);
        let arrays = self
            .get_json::<ApiResponse<ArrayRegistrationInfo>>(&url, &[])
            .await?
            .response;
        debug!(count = arrays.len(), "Discovered arrays");
        Ok(arrays)
    }
}

#[async_trait]
impl ArrayMetadata for ApiServerConnection {
    async fn patch(&self, array_id: &str, patch: &ArrayPatchInfo) -> TelemetryResult<()> {
        let url = format!("{}/arrays", self.base_url);
        let request = self
            .http
            .patch(&url)
            .query(&[("ids", array_id)])
            .json(patch);
        match request.send().await {
            Ok(response) => {
                if response.status().is_success() {
                    debug!(device_id = array_id, status = %patch.status, "Patched array");
                    Ok(())
                } else {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    error!(
                        device_id = array_id,
                        status_code = status.as_u16(),
                        body = %body,
                        "Array patch rejected by API server"
                    );
                    Err(TelemetryError::Metadata(format!(
                        "PATCH {url}?ids={array_id} returned {status}"
                    )))
                }
            }
            Err(e) => {
                error!(device_id = array_id, error = %e, "Could not reach API server");
                Err(e.into())
            }
        }
    }

    async fn get_tags(&self, array_id: &str) -> TelemetryResult<HashMap<String, String>> {
        let url = format!("{}/arrays/tags", self.base_url);
        let arrays = self
            .get_json::<ApiResponse<ArrayTags>>(&url, &[("ids", array_id)])
            .await?
            .response;

        if arrays.is_empty() {
            return Err(TelemetryError::Metadata(
                "Response contained no arrays".to_string(),
            ));
        }

        let Some(array) = arrays.into_iter().find(|a| a.id == array_id) else {
            warn!(device_id = array_id, "Tag response did not include the requested array");
            return Err(TelemetryError::Metadata(
                "Response did not contain an array with the matching ID".to_string(),
            ));
        };

        Ok(array
            .tags
            .into_iter()
            .filter(|tag| !tag.key.is_empty())
            .map(|tag| (tag.key, tag.value))
            .collect())
    }
}
