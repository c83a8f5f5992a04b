use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings shared by every device protocol client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// "https" in production; "http" only for mock devices
    pub scheme: String,
    pub accept_invalid_certs: bool,
    /// No per-request deadline when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_seconds: Option<u64>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            scheme: "https".to_string(),
            accept_invalid_certs: true,
            request_timeout_seconds: None,
        }
    }
}

impl DeviceConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.scheme != "http" && self.scheme != "https" {
            return Err(anyhow::anyhow!("无效的设备协议: {}", self.scheme));
        }
        if self.request_timeout_seconds == Some(0) {
            return Err(anyhow::anyhow!("设备请求超时时间必须大于0"));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_seconds.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Memory,
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub kind: StoreKind,
    pub data_dir: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: StoreKind::File,
            data_dir: "data/telemetry".to_string(),
        }
    }
}

impl StoreConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.kind == StoreKind::File && self.data_dir.is_empty() {
            return Err(anyhow::anyhow!("文件存储目录不能为空"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub api_server_url: String,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            api_server_url: "http://pure1-unplugged-api-server".to_string(),
        }
    }
}

impl DiscoveryConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_server_url.is_empty() {
            return Err(anyhow::anyhow!("API服务器地址不能为空"));
        }
        if !self.api_server_url.starts_with("http://")
            && !self.api_server_url.starts_with("https://")
        {
            return Err(anyhow::anyhow!(
                "API服务器地址必须以http://或https://开头: {}",
                self.api_server_url
            ));
        }
        Ok(())
    }
}
