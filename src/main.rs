use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use array_telemetry::app::{AppMode, Application};
use array_telemetry::shutdown::ShutdownManager;
use clap::{Arg, Command};
use metrics_exporter_prometheus::PrometheusBuilder;
use telemetry_core::config::AppConfig;
use telemetry_core::{LogFormat, LogLevel};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // 解析命令行参数
    let matches = Command::new("metrics-client")
        .version("1.0.0")
        .about("存储阵列遥测采集服务")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("配置文件路径 (未指定时查找默认路径)"),
        )
        .arg(
            Arg::new("mode")
                .short('m')
                .long("mode")
                .value_name("MODE")
                .help("运行模式")
                .value_parser(["metrics", "monitor", "all"])
                .default_value("all"),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("日志级别 (默认取配置文件中的级别)")
                .value_parser(["trace", "debug", "info", "warn", "error"]),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .value_name("FORMAT")
                .help("日志格式")
                .value_parser(["json", "pretty"])
                .default_value("pretty"),
        )
        .get_matches();

    let config_path = matches.get_one::<String>("config");
    let mode_str = matches.get_one::<String>("mode").unwrap();
    let log_format = matches.get_one::<String>("log-format").unwrap();

    // 加载配置
    let config = AppConfig::load(config_path.map(String::as_str))
        .with_context(|| format!("加载配置失败: {config_path:?}"))?;

    // 命令行级别优先于配置文件
    let log_level = matches
        .get_one::<String>("log-level")
        .unwrap_or(&config.observability.log_level);
    init_logging(log_level, log_format)?;

    info!("启动存储阵列遥测采集服务");
    info!("运行模式: {mode_str}");

    if let Some(listen) = &config.observability.prometheus_listen {
        init_metrics_exporter(listen)?;
    }

    let app_mode = AppMode::parse(mode_str)?;
    let app = Arc::new(Application::new(config, app_mode).await?);

    let shutdown_manager = ShutdownManager::new();

    let app_handle = {
        let shutdown_rx = shutdown_manager.subscribe().await;
        let app = Arc::clone(&app);

        tokio::spawn(async move {
            if let Err(e) = app.run(shutdown_rx).await {
                error!("应用运行失败: {e}");
            }
        })
    };

    shutdown_manager.shutdown_on_signal().await;

    // 等待应用关闭，设置超时
    match tokio::time::timeout(Duration::from_secs(30), app_handle).await {
        Ok(Ok(())) => info!("应用已优雅关闭"),
        Ok(Err(e)) => error!("应用关闭时发生错误: {e}"),
        Err(_) => warn!("应用关闭超时，强制退出"),
    }

    info!("存储阵列遥测采集服务已退出");
    Ok(())
}

/// 初始化日志系统
fn init_logging(log_level: &str, log_format: &str) -> Result<()> {
    let level = LogLevel::from_str(log_level)?;
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_filter()));

    let registry = tracing_subscriber::registry().with(env_filter);

    match LogFormat::from_str(log_format)? {
        LogFormat::Json => {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()
                .context("初始化JSON日志格式失败")?;
        }
        LogFormat::Pretty => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty())
                .try_init()
                .context("初始化Pretty日志格式失败")?;
        }
    }

    Ok(())
}

/// 启动Prometheus抓取端点
fn init_metrics_exporter(listen: &str) -> Result<()> {
    let addr: SocketAddr = listen
        .parse()
        .with_context(|| format!("无效的Prometheus监听地址: {listen}"))?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("启动Prometheus导出器失败")?;

    info!("Prometheus指标端点: http://{addr}/metrics");
    Ok(())
}
