use crate::config::models::{AppConfig, StoreKind};

#[test]
fn test_default_config() {
    let config = AppConfig::default();
    assert!(config.validate().is_ok());

    // 验证默认值
    assert_eq!(config.pool.worker_count, 50);
    assert_eq!(config.pool.queue_capacity, 200);
    assert_eq!(config.collection.array_metric_period_seconds, 30);
    assert_eq!(config.collection.fa_volume_period_seconds, 30);
    assert_eq!(config.collection.fb_volume_period_seconds, 300);
    assert_eq!(config.monitor.period_seconds, 15);
    assert_eq!(config.retention.metrics_days, 31);
    assert_eq!(config.retention.alerts_days, 365);
    assert_eq!(config.device.scheme, "https");
    assert_eq!(config.store.kind, StoreKind::File);
    assert_eq!(
        config.discovery.api_server_url,
        "http://pure1-unplugged-api-server"
    );
}

#[test]
fn test_config_from_partial_toml() {
    let toml_content = r#"
[pool]
worker_count = 4
queue_capacity = 8

[collection]
fb_volume_period_seconds = 600

[device]
scheme = "http"
request_timeout_seconds = 5

[store]
kind = "memory"

[observability]
log_level = "debug"
prometheus_listen = "127.0.0.1:9100"
"#;

    let config = AppConfig::from_toml(toml_content).unwrap();

    assert_eq!(config.pool.worker_count, 4);
    assert_eq!(config.pool.queue_capacity, 8);
    assert_eq!(config.collection.fb_volume_period_seconds, 600);
    // 未指定的字段保持默认值
    assert_eq!(config.collection.array_metric_period_seconds, 30);
    assert_eq!(config.device.scheme, "http");
    assert_eq!(
        config.device.request_timeout(),
        Some(std::time::Duration::from_secs(5))
    );
    assert_eq!(config.store.kind, StoreKind::Memory);
    assert_eq!(config.observability.log_level, "debug");
    assert_eq!(
        config.observability.prometheus_listen.as_deref(),
        Some("127.0.0.1:9100")
    );
}

#[test]
fn test_config_to_toml() {
    let config = AppConfig::default();
    let toml_str = config.to_toml().unwrap();

    assert!(toml_str.contains("[pool]"));
    assert!(toml_str.contains("worker_count = 50"));

    let parsed = AppConfig::from_toml(&toml_str).unwrap();
    assert_eq!(parsed.retention.check_period_hours, 24);
}

#[test]
fn test_invalid_pool_rejected() {
    let mut config = AppConfig::default();
    config.pool.worker_count = 0;
    assert!(config.validate().is_err());

    let mut config = AppConfig::default();
    config.pool.queue_capacity = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_invalid_device_scheme_rejected() {
    let mut config = AppConfig::default();
    config.device.scheme = "ftp".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_invalid_log_level_rejected() {
    let mut config = AppConfig::default();
    config.observability.log_level = "loud".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_invalid_prometheus_listen_rejected() {
    let mut config = AppConfig::default();
    config.observability.prometheus_listen = Some("not-an-address".to_string());
    assert!(config.validate().is_err());
}

#[test]
fn test_zero_retention_days_rejected() {
    let mut config = AppConfig::default();
    config.retention.alerts_days = 0;
    let err = config.validate().unwrap_err();
    assert!(format!("{err:#}").contains("alerts_days"));
}

#[test]
fn test_discovery_url_requires_scheme() {
    let mut config = AppConfig::default();
    config.discovery.api_server_url = "pure1-unplugged-api-server".to_string();
    assert!(config.validate().is_err());
}
