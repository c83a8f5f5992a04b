use serde::{Deserialize, Serialize};

use crate::logging::LogLevel;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub log_level: String,
    /// host:port for the Prometheus scrape endpoint; disabled when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prometheus_listen: Option<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            prometheus_listen: None,
        }
    }
}

impl ObservabilityConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        LogLevel::from_str(&self.log_level).map_err(|e| anyhow::anyhow!("{e}"))?;

        if let Some(listen) = &self.prometheus_listen {
            if listen.parse::<std::net::SocketAddr>().is_err() {
                return Err(anyhow::anyhow!("Prometheus监听地址格式无效，应为 host:port: {listen}"));
            }
        }
        Ok(())
    }
}
