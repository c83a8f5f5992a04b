//! 配置管理
//!
//! 默认值、TOML配置文件与 `TELEMETRY_` 前缀环境变量三层合并，
//! 加载完成后统一校验。

pub mod models;

#[cfg(test)]
mod tests;

pub use models::{
    AppConfig, CollectionConfig, DeviceConfig, DiscoveryConfig, MonitorConfig,
    ObservabilityConfig, PoolConfig, RetentionConfig, StoreConfig, StoreKind,
};
