pub mod app_config;
pub mod device_store;
pub mod observability;
pub mod pool_schedule;
pub mod retention;

// Re-export main types for easier imports
pub use app_config::AppConfig;
pub use device_store::{DeviceConfig, DiscoveryConfig, StoreConfig, StoreKind};
pub use observability::ObservabilityConfig;
pub use pool_schedule::{CollectionConfig, MonitorConfig, PoolConfig};
pub use retention::RetentionConfig;
