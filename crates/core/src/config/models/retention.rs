use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Data retention configuration (ages in days)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    pub check_period_hours: u64,
    pub metrics_days: u32,
    pub alerts_days: u32,
    pub error_log_days: u32,
    pub timer_log_days: u32,
    /// Staleness budget for the cleanup jobs
    pub job_stale_after_seconds: u64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            check_period_hours: 24,
            metrics_days: 31,
            alerts_days: 365,
            error_log_days: 1,
            timer_log_days: 1,
            job_stale_after_seconds: 3600,
        }
    }
}

impl RetentionConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.check_period_hours == 0 {
            return Err(anyhow::anyhow!("保留期检查周期必须大于0"));
        }

        for (name, days) in [
            ("metrics_days", self.metrics_days),
            ("alerts_days", self.alerts_days),
            ("error_log_days", self.error_log_days),
            ("timer_log_days", self.timer_log_days),
        ] {
            if days == 0 {
                return Err(anyhow::anyhow!("保留天数必须大于0: {name}"));
            }
        }

        Ok(())
    }

    pub fn check_period(&self) -> Duration {
        Duration::from_secs(self.check_period_hours * 3600)
    }

    pub fn job_stale_after(&self) -> Duration {
        Duration::from_secs(self.job_stale_after_seconds)
    }
}
