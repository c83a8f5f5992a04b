//! Metrics stores built on daily indices.

mod file;
mod memory;
pub mod retention;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::warn;

use telemetry_domain::Alert;

pub use file::FileMetricsStore;
pub use memory::InMemoryMetricsStore;

/// Source of "now" for index naming and retention
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub fn system_clock() -> Clock {
    Arc::new(Utc::now)
}

/// Alerts that carry a usable natural key and creation time
fn storable_alerts(alerts: &[Alert]) -> impl Iterator<Item = &Alert> {
    alerts.iter().filter(|alert| {
        let storable = !alert.array_id.is_empty() && alert.alert_id != 0 && alert.created != 0;
        if !storable {
            warn!(
                device_id = %alert.array_id,
                alert_id = alert.alert_id,
                "Skipping alert without array ID, alert ID or creation time"
            );
        }
        storable
    })
}
