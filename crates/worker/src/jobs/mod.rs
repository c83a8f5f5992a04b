//! Pipeline jobs run by the worker pool.

mod cleanup;
mod collect;
mod monitor;
mod push;

use std::time::Duration;

pub use cleanup::{AlertCleanupJob, ErrorLogCleanupJob, MetricCleanupJob, TimerLogCleanupJob};
pub use collect::{ArrayMetricCollectJob, ArrayVolumeMetricCollectJob};
pub use monitor::{unable_to_connect_status, MonitorCheckJob, STATUS_CONNECTED};
pub use push::{ArrayAlertPushJob, ArrayMetricPushJob, ArrayVolumeMetricPushJob};

/// Staleness budget of the push jobs a collection enqueues
pub const PUSH_STALE_AFTER: Duration = Duration::from_secs(60);
