use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error};

use telemetry_core::StageTimer;
use telemetry_dispatcher::{Job, JobContext, WorkerPool};
use telemetry_domain::{ArrayCollector, ArrayRegistrationInfo, CollectorFactory, MetricsStore};

use super::push::{ArrayAlertPushJob, ArrayMetricPushJob, ArrayVolumeMetricPushJob};
use super::PUSH_STALE_AFTER;

/// Collaborators shared by both collection jobs
struct Collaborators<'a> {
    device: &'a ArrayRegistrationInfo,
    store: &'a Arc<dyn MetricsStore>,
    pool: &'a WorkerPool,
    collector: Arc<dyn ArrayCollector>,
}

/// Check the preconditions and connect to the device. `None` means the
/// job already logged why it stopped.
async fn connect<'a>(
    subject: &str,
    device: &'a Option<ArrayRegistrationInfo>,
    store: &'a Option<Arc<dyn MetricsStore>>,
    factory: &'a Option<Arc<dyn CollectorFactory>>,
    pool: &'a Option<WorkerPool>,
) -> Option<Collaborators<'a>> {
    let Some(device) = device else {
        error!("Tried to fetch {subject}, but array was nil, stopping");
        return None;
    };
    let Some(store) = store else {
        error!(
            device_id = %device.id,
            "Tried to fetch {subject}, but database was nil, stopping (nowhere to put data)"
        );
        return None;
    };
    let Some(pool) = pool else {
        error!(
            device_id = %device.id,
            "Tried to fetch {subject}, but worker pool was nil, stopping (nowhere to send data)"
        );
        return None;
    };
    let Some(factory) = factory else {
        error!(
            device_id = %device.id,
            "Tried to fetch {subject}, but collector factory was nil, stopping"
        );
        return None;
    };

    match factory.initialize_collector(device).await {
        Ok(collector) => Some(Collaborators {
            device,
            store,
            pool,
            collector,
        }),
        Err(e) => {
            error!(
                device_id = %device.id,
                device_name = %device.name,
                device_mgmt_endpoint = %device.mgmt_endpoint,
                error = %e,
                "Error instantiating connection for array, stopping"
            );
            None
        }
    }
}

/// Times a whole job execution, tagged with the device when one is set
fn execute_timer(process_name: &str, device: &Option<ArrayRegistrationInfo>) -> StageTimer {
    let fields = device
        .as_ref()
        .map(|d| d.log_fields(true))
        .unwrap_or_default();
    StageTimer::new(process_name, fields)
}

/// Collects array-level metrics and alerts, then hands them to push jobs
pub struct ArrayMetricCollectJob {
    pub device: Option<ArrayRegistrationInfo>,
    pub store: Option<Arc<dyn MetricsStore>>,
    pub factory: Option<Arc<dyn CollectorFactory>>,
    pub pool: Option<WorkerPool>,
}

impl ArrayMetricCollectJob {
    pub fn new(
        device: ArrayRegistrationInfo,
        store: Arc<dyn MetricsStore>,
        factory: Arc<dyn CollectorFactory>,
        pool: WorkerPool,
    ) -> Self {
        Self {
            device: Some(device),
            store: Some(store),
            factory: Some(factory),
            pool: Some(pool),
        }
    }
}

#[async_trait]
impl Job for ArrayMetricCollectJob {
    fn description(&self) -> String {
        match &self.device {
            Some(device) => format!("ArrayMetricCollectJob({})", device.name),
            None => "ArrayMetricCollectJob".to_string(),
        }
    }

    fn device_id(&self) -> Option<String> {
        self.device.as_ref().map(|d| d.id.clone())
    }

    async fn execute(&self, _ctx: &JobContext) {
        let mut timer = execute_timer("ArrayMetricCollectJob.Execute", &self.device);
        let Some(c) = connect(
            "metrics",
            &self.device,
            &self.store,
            &self.factory,
            &self.pool,
        )
        .await
        else {
            return;
        };

        timer.stage("collecting");
        let data = match c.collector.get_all_array_data().await {
            Ok(data) => data,
            Err(e) => {
                error!(device_id = %c.device.id, error = %e, "Error collecting array metrics, stopping");
                return;
            }
        };

        debug!(
            device_id = %c.device.id,
            alerts = data.alerts.len(),
            "Collected array metrics, pushing"
        );
        c.pool.enqueue(
            Box::new(ArrayMetricPushJob::new(
                vec![data.array_metric],
                Arc::clone(c.store),
            )),
            PUSH_STALE_AFTER,
        );
        c.pool.enqueue(
            Box::new(ArrayAlertPushJob::new(data.alerts, Arc::clone(c.store))),
            PUSH_STALE_AFTER,
        );
    }
}

/// Collects per-volume (or per-file-system) metrics over `time_window`
/// seconds, then hands them to a push job
pub struct ArrayVolumeMetricCollectJob {
    pub device: Option<ArrayRegistrationInfo>,
    pub store: Option<Arc<dyn MetricsStore>>,
    pub factory: Option<Arc<dyn CollectorFactory>>,
    pub pool: Option<WorkerPool>,
    pub time_window: i64,
}

impl ArrayVolumeMetricCollectJob {
    pub fn new(
        device: ArrayRegistrationInfo,
        store: Arc<dyn MetricsStore>,
        factory: Arc<dyn CollectorFactory>,
        pool: WorkerPool,
        time_window: i64,
    ) -> Self {
        Self {
            device: Some(device),
            store: Some(store),
            factory: Some(factory),
            pool: Some(pool),
            time_window,
        }
    }
}

#[async_trait]
impl Job for ArrayVolumeMetricCollectJob {
    fn description(&self) -> String {
        match &self.device {
            Some(device) => format!("ArrayVolumeMetricCollectJob({})", device.name),
            None => "ArrayVolumeMetricCollectJob".to_string(),
        }
    }

    fn device_id(&self) -> Option<String> {
        self.device.as_ref().map(|d| d.id.clone())
    }

    async fn execute(&self, _ctx: &JobContext) {
        let mut timer = execute_timer("ArrayVolumeMetricCollectJob.Execute", &self.device);
        let Some(c) = connect(
            "volume metrics",
            &self.device,
            &self.store,
            &self.factory,
            &self.pool,
        )
        .await
        else {
            return;
        };

        timer.stage("collecting");
        let data = match c.collector.get_all_volume_data(self.time_window).await {
            Ok(data) => data,
            Err(e) => {
                error!(device_id = %c.device.id, error = %e, "Error collecting volume metrics, stopping");
                return;
            }
        };

        debug!(
            device_id = %c.device.id,
            volumes = data.volume_metrics.len(),
            "Collected volume metrics, pushing"
        );
        c.pool.enqueue(
            Box::new(ArrayVolumeMetricPushJob::new(
                data.volume_metrics,
                Arc::clone(c.store),
            )),
            PUSH_STALE_AFTER,
        );
    }
}
