use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{
    device_store::{DeviceConfig, DiscoveryConfig, StoreConfig},
    observability::ObservabilityConfig,
    pool_schedule::{CollectionConfig, MonitorConfig, PoolConfig},
    retention::RetentionConfig,
};

/// 遥测服务配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub pool: PoolConfig,
    pub collection: CollectionConfig,
    pub monitor: MonitorConfig,
    pub retention: RetentionConfig,
    pub device: DeviceConfig,
    pub store: StoreConfig,
    pub discovery: DiscoveryConfig,
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    ///
    /// 加载顺序:
    /// 1. 默认配置
    /// 2. 配置文件 (TOML)
    /// 3. 环境变量覆盖 (前缀: TELEMETRY_, 层级分隔符: __)
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = ConfigBuilder::builder()
            .set_default("pool.worker_count", 50)?
            .set_default("pool.queue_capacity", 200)?
            .set_default("collection.array_metric_period_seconds", 30)?
            .set_default("collection.fa_volume_period_seconds", 30)?
            .set_default("collection.fb_volume_period_seconds", 300)?
            .set_default("monitor.period_seconds", 15)?
            .set_default("retention.check_period_hours", 24)?
            .set_default("retention.metrics_days", 31)?
            .set_default("retention.alerts_days", 365)?
            .set_default("retention.error_log_days", 1)?
            .set_default("retention.timer_log_days", 1)?
            .set_default("retention.job_stale_after_seconds", 3600)?
            .set_default("device.scheme", "https")?
            .set_default("device.accept_invalid_certs", true)?
            .set_default("store.kind", "file")?
            .set_default("store.data_dir", "data/telemetry")?
            .set_default("discovery.api_server_url", "http://pure1-unplugged-api-server")?
            .set_default("observability.log_level", "info")?;

        if let Some(path) = config_path {
            if Path::new(path).exists() {
                builder = builder.add_source(File::new(path, FileFormat::Toml));
            } else {
                return Err(anyhow::anyhow!("配置文件不存在: {}", path));
            }
        } else {
            let default_paths = [
                "config/telemetry.toml",
                "telemetry.toml",
                "/etc/telemetry/config.toml",
            ];

            if let Some(path) = default_paths.iter().find(|p| Path::new(p).exists()) {
                builder = builder.add_source(File::new(path, FileFormat::Toml));
            }
        }

        // 环境变量覆盖，优先级最高
        builder = builder.add_source(
            Environment::with_prefix("TELEMETRY")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: AppConfig = builder
            .build()
            .context("构建配置失败")?
            .try_deserialize()
            .context("反序列化配置失败")?;

        config.validate()?;

        Ok(config)
    }

    /// 从TOML字符串加载配置
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(toml_str).context("解析TOML配置失败")?;

        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("序列化配置为TOML失败")
    }

    /// 校验配置有效性
    pub fn validate(&self) -> Result<()> {
        self.pool.validate().context("线程池配置验证失败")?;
        self.collection.validate().context("采集配置验证失败")?;
        self.monitor.validate().context("监控配置验证失败")?;
        self.retention.validate().context("保留期配置验证失败")?;
        self.device.validate().context("设备客户端配置验证失败")?;
        self.store.validate().context("存储配置验证失败")?;
        self.discovery.validate().context("发现服务配置验证失败")?;
        self.observability
            .validate()
            .context("可观测性配置验证失败")?;

        Ok(())
    }
}
