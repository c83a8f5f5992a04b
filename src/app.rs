use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use telemetry_core::config::{AppConfig, StoreKind};
use telemetry_dispatcher::WorkerPool;
use telemetry_domain::{
    ArrayDiscovery, ArrayMetadata, ArrayRegistrationInfo, CollectorFactory, DeviceType,
    MetricsStore,
};
use telemetry_infrastructure::{
    ApiServerConnection, DeviceClientSettings, FileMetricsStore, InMemoryMetricsStore,
    RestCollectorFactory,
};
use telemetry_worker::{
    AlertCleanupJob, ArrayMetricCollectJob, ArrayVolumeMetricCollectJob, ErrorLogCleanupJob,
    MetricCleanupJob, MonitorCheckJob, TimerLogCleanupJob,
};
use tokio::sync::broadcast;
use tracing::{debug, error, info};

/// 应用运行模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    /// 周期采集阵列与卷指标，并执行数据保留清理
    Metrics,
    /// 周期检查阵列连通性并回写状态
    Monitor,
    /// 同时运行以上两者
    All,
}

impl AppMode {
    pub fn parse(mode: &str) -> Result<Self> {
        match mode {
            "metrics" => Ok(AppMode::Metrics),
            "monitor" => Ok(AppMode::Monitor),
            "all" => Ok(AppMode::All),
            _ => Err(anyhow::anyhow!("不支持的运行模式: {mode}")),
        }
    }

    fn runs_metrics(self) -> bool {
        matches!(self, AppMode::Metrics | AppMode::All)
    }

    fn runs_monitor(self) -> bool {
        matches!(self, AppMode::Monitor | AppMode::All)
    }
}

/// 驱动循环依赖的外部协作者
#[derive(Clone)]
pub struct Collaborators {
    pub store: Arc<dyn MetricsStore>,
    pub discovery: Arc<dyn ArrayDiscovery>,
    pub metadata: Arc<dyn ArrayMetadata>,
    pub factory: Arc<dyn CollectorFactory>,
}

impl Collaborators {
    /// 按配置创建存储、API服务器连接与采集器工厂
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let store: Arc<dyn MetricsStore> = match config.store.kind {
            StoreKind::Memory => Arc::new(InMemoryMetricsStore::new()),
            StoreKind::File => Arc::new(
                FileMetricsStore::open(&config.store.data_dir)
                    .await
                    .with_context(|| format!("打开文件存储失败: {}", config.store.data_dir))?,
            ),
        };

        let api_server = Arc::new(
            ApiServerConnection::new(&config.discovery.api_server_url)
                .context("创建API服务器连接失败")?,
        );
        let factory = Arc::new(RestCollectorFactory::new(
            api_server.clone(),
            DeviceClientSettings::from(&config.device),
        ));

        Ok(Self {
            store,
            discovery: api_server.clone(),
            metadata: api_server,
            factory,
        })
    }
}

/// 一个定时触发的驱动任务
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tick {
    ArrayMetrics,
    VolumeMetrics(VolumeFamily),
    Retention,
    Monitor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VolumeFamily {
    FlashArray,
    FlashBlade,
}

impl VolumeFamily {
    fn matches(self, device_type: &DeviceType) -> bool {
        matches!(
            (self, device_type),
            (VolumeFamily::FlashArray, DeviceType::FlashArray)
                | (VolumeFamily::FlashBlade, DeviceType::FlashBlade)
        )
    }
}

/// 主应用程序
pub struct Application {
    config: AppConfig,
    mode: AppMode,
    collaborators: Collaborators,
}

impl Application {
    pub async fn new(config: AppConfig, mode: AppMode) -> Result<Self> {
        info!("初始化应用程序，模式: {:?}", mode);
        let collaborators = Collaborators::from_config(&config).await?;
        Ok(Self::with_collaborators(config, mode, collaborators))
    }

    pub fn with_collaborators(
        config: AppConfig,
        mode: AppMode,
        collaborators: Collaborators,
    ) -> Self {
        Self {
            config,
            mode,
            collaborators,
        }
    }

    /// 运行驱动循环，直到收到关闭信号且所有worker退出
    pub async fn run(&self, mut shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        info!("启动应用程序，模式: {:?}", self.mode);

        let pool = WorkerPool::new(
            self.config.pool.worker_count,
            self.config.pool.queue_capacity,
            shutdown_rx.resubscribe(),
        );
        let driver = Arc::new(Driver {
            config: self.config.clone(),
            collaborators: self.collaborators.clone(),
            pool: pool.clone(),
        });

        let mut schedule = Vec::new();
        if self.mode.runs_metrics() {
            let collection = &self.config.collection;
            schedule.push((Tick::ArrayMetrics, collection.array_metric_period()));
            schedule.push((
                Tick::VolumeMetrics(VolumeFamily::FlashArray),
                collection.fa_volume_period(),
            ));
            schedule.push((
                Tick::VolumeMetrics(VolumeFamily::FlashBlade),
                collection.fb_volume_period(),
            ));
            schedule.push((Tick::Retention, self.config.retention.check_period()));
        }
        if self.mode.runs_monitor() {
            schedule.push((Tick::Monitor, self.config.monitor.period()));
        }

        let handles: Vec<_> = schedule
            .into_iter()
            .map(|(tick, period)| {
                let driver = Arc::clone(&driver);
                let shutdown_rx = shutdown_rx.resubscribe();
                tokio::spawn(async move { driver.run_loop(tick, period, shutdown_rx).await })
            })
            .collect();

        // 等待关闭信号
        let _ = shutdown_rx.recv().await;
        info!("驱动循环收到关闭信号");

        for handle in handles {
            if let Err(e) = handle.await {
                error!("驱动任务异常退出: {e}");
            }
        }
        pool.join().await;

        info!("应用程序已停止");
        Ok(())
    }
}

struct Driver {
    config: AppConfig,
    collaborators: Collaborators,
    pool: WorkerPool,
}

impl Driver {
    async fn run_loop(&self, tick: Tick, period: Duration, mut shutdown_rx: broadcast::Receiver<()>) {
        let mut interval = tokio::time::interval(period);
        info!(?tick, period_seconds = period.as_secs(), "启动定时驱动");

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let enqueued = self.on_tick(tick, period).await;
                    debug!(?tick, enqueued, "Tick dispatched");
                }
                _ = shutdown_rx.recv() => {
                    info!(?tick, "定时驱动收到关闭信号");
                    break;
                }
            }
        }
    }

    /// Returns how many jobs were handed to the pool
    async fn on_tick(&self, tick: Tick, period: Duration) -> usize {
        match tick {
            Tick::Retention => self.enqueue_cleanup_jobs(),
            Tick::ArrayMetrics | Tick::VolumeMetrics(_) | Tick::Monitor => {
                let Some(devices) = self.discover().await else {
                    return 0;
                };
                self.enqueue_device_jobs(tick, period, devices)
            }
        }
    }

    async fn discover(&self) -> Option<Vec<ArrayRegistrationInfo>> {
        match self.collaborators.discovery.get_arrays().await {
            Ok(devices) => Some(devices),
            Err(e) => {
                error!(error = %e, "Error discovering arrays, skipping this round");
                None
            }
        }
    }

    fn enqueue_device_jobs(
        &self,
        tick: Tick,
        period: Duration,
        devices: Vec<ArrayRegistrationInfo>,
    ) -> usize {
        let c = &self.collaborators;
        let time_window = period.as_secs() as i64;
        let mut enqueued = 0;

        for device in devices {
            let job: Box<dyn telemetry_dispatcher::Job> = match tick {
                Tick::ArrayMetrics => Box::new(ArrayMetricCollectJob::new(
                    device,
                    Arc::clone(&c.store),
                    Arc::clone(&c.factory),
                    self.pool.clone(),
                )),
                Tick::VolumeMetrics(family) if family.matches(&device.device_type) => {
                    Box::new(ArrayVolumeMetricCollectJob::new(
                        device,
                        Arc::clone(&c.store),
                        Arc::clone(&c.factory),
                        self.pool.clone(),
                        time_window,
                    ))
                }
                Tick::Monitor => Box::new(MonitorCheckJob::new(
                    device,
                    Arc::clone(&c.factory),
                    Arc::clone(&c.metadata),
                )),
                Tick::VolumeMetrics(_) | Tick::Retention => continue,
            };
            self.pool.enqueue(job, period);
            enqueued += 1;
        }
        enqueued
    }

    fn enqueue_cleanup_jobs(&self) -> usize {
        let retention = &self.config.retention;
        let stale_after = retention.job_stale_after();
        let store = &self.collaborators.store;

        info!(
            metrics_days = retention.metrics_days,
            alerts_days = retention.alerts_days,
            error_log_days = retention.error_log_days,
            timer_log_days = retention.timer_log_days,
            "Scheduling retention cleanup"
        );
        self.pool.enqueue(
            Box::new(MetricCleanupJob::new(Arc::clone(store), retention.metrics_days)),
            stale_after,
        );
        self.pool.enqueue(
            Box::new(AlertCleanupJob::new(Arc::clone(store), retention.alerts_days)),
            stale_after,
        );
        self.pool.enqueue(
            Box::new(ErrorLogCleanupJob::new(
                Arc::clone(store),
                retention.error_log_days,
            )),
            stale_after,
        );
        self.pool.enqueue(
            Box::new(TimerLogCleanupJob::new(
                Arc::clone(store),
                retention.timer_log_days,
            )),
            stale_after,
        );
        4
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use telemetry_infrastructure::InMemoryMetadata;

    fn devices() -> Vec<ArrayRegistrationInfo> {
        vec![
            ArrayRegistrationInfo::new("a1", "fa-one", "10.0.0.1", "t1", DeviceType::FlashArray),
            ArrayRegistrationInfo::new("b1", "fb-one", "10.0.0.2", "t2", DeviceType::FlashBlade),
            ArrayRegistrationInfo::new(
                "x1",
                "mystery",
                "10.0.0.3",
                "t3",
                DeviceType::Other("Toaster".to_string()),
            ),
        ]
    }

    fn collaborators(metadata: Arc<InMemoryMetadata>) -> Collaborators {
        Collaborators {
            store: Arc::new(InMemoryMetricsStore::new()),
            discovery: metadata.clone(),
            metadata: metadata.clone(),
            factory: Arc::new(RestCollectorFactory::new(
                metadata,
                DeviceClientSettings::plain_http(),
            )),
        }
    }

    fn driver(metadata: Arc<InMemoryMetadata>) -> (Driver, broadcast::Sender<()>) {
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let driver = Driver {
            config: AppConfig::default(),
            collaborators: collaborators(metadata),
            pool: WorkerPool::new(2, 16, shutdown_rx),
        };
        (driver, shutdown_tx)
    }

    #[test]
    fn test_parse_mode() {
        assert_eq!(AppMode::parse("metrics").unwrap(), AppMode::Metrics);
        assert_eq!(AppMode::parse("monitor").unwrap(), AppMode::Monitor);
        assert_eq!(AppMode::parse("all").unwrap(), AppMode::All);
        assert!(AppMode::parse("dispatcher").is_err());
        assert!(AppMode::All.runs_metrics() && AppMode::All.runs_monitor());
        assert!(!AppMode::Monitor.runs_metrics());
    }

    #[tokio::test]
    async fn test_volume_ticks_filter_by_family() {
        let (driver, _shutdown) = driver(Arc::new(InMemoryMetadata::new(devices())));
        let period = Duration::from_secs(30);

        assert_eq!(driver.on_tick(Tick::ArrayMetrics, period).await, 3);
        assert_eq!(
            driver
                .on_tick(Tick::VolumeMetrics(VolumeFamily::FlashArray), period)
                .await,
            1
        );
        assert_eq!(
            driver
                .on_tick(Tick::VolumeMetrics(VolumeFamily::FlashBlade), period)
                .await,
            1
        );
        assert_eq!(driver.on_tick(Tick::Retention, period).await, 4);
    }

    #[tokio::test]
    async fn test_discovery_failure_skips_tick() {
        let metadata = Arc::new(InMemoryMetadata::new(devices()).failing_discovery());
        let (driver, _shutdown) = driver(metadata);

        assert_eq!(
            driver.on_tick(Tick::ArrayMetrics, Duration::from_secs(30)).await,
            0
        );
        assert_eq!(driver.on_tick(Tick::Monitor, Duration::from_secs(15)).await, 0);
    }

    #[tokio::test]
    async fn test_monitor_mode_reports_unknown_device() {
        let unknown = ArrayRegistrationInfo::new(
            "x1",
            "mystery",
            "10.0.0.3",
            "t3",
            DeviceType::Other("Toaster".to_string()),
        );
        let metadata = Arc::new(InMemoryMetadata::new(vec![unknown]));
        let mut config = AppConfig::default();
        config.pool.worker_count = 1;
        let app = Application::with_collaborators(
            config,
            AppMode::Monitor,
            collaborators(metadata.clone()),
        );

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = tokio::spawn(async move { app.run(shutdown_rx).await });

        // 第一次tick立即触发
        let mut patches = Vec::new();
        for _ in 0..100 {
            patches = metadata.patches().await;
            if !patches.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        shutdown_tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap()
            .unwrap();

        assert_eq!(patches[0].0, "x1");
        assert!(patches[0].1.status.starts_with("Unable to connect. Error: "));
        assert!(patches[0].1.status.contains("Toaster"));
    }
}
