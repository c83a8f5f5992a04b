use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Worker pool sizing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub worker_count: usize,
    pub queue_capacity: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            worker_count: 50,
            queue_capacity: 200,
        }
    }
}

impl PoolConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.worker_count == 0 {
            return Err(anyhow::anyhow!("worker数量必须大于0"));
        }

        if self.queue_capacity == 0 {
            return Err(anyhow::anyhow!("队列容量必须大于0"));
        }

        Ok(())
    }
}

/// Collection periods. Each period doubles as the staleness budget of the
/// collect jobs enqueued for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionConfig {
    pub array_metric_period_seconds: u64,
    pub fa_volume_period_seconds: u64,
    pub fb_volume_period_seconds: u64,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            array_metric_period_seconds: 30,
            fa_volume_period_seconds: 30,
            fb_volume_period_seconds: 300,
        }
    }
}

impl CollectionConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.array_metric_period_seconds == 0 {
            return Err(anyhow::anyhow!("阵列指标采集周期必须大于0"));
        }

        if self.fa_volume_period_seconds == 0 || self.fb_volume_period_seconds == 0 {
            return Err(anyhow::anyhow!("卷指标采集周期必须大于0"));
        }

        Ok(())
    }

    pub fn array_metric_period(&self) -> Duration {
        Duration::from_secs(self.array_metric_period_seconds)
    }

    pub fn fa_volume_period(&self) -> Duration {
        Duration::from_secs(self.fa_volume_period_seconds)
    }

    pub fn fb_volume_period(&self) -> Duration {
        Duration::from_secs(self.fb_volume_period_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub period_seconds: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self { period_seconds: 15 }
    }
}

impl MonitorConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.period_seconds == 0 {
            return Err(anyhow::anyhow!("监控检查周期必须大于0"));
        }
        Ok(())
    }

    pub fn period(&self) -> Duration {
        Duration::from_secs(self.period_seconds)
    }
}
