use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Execution context handed to every dispatched job.
#[derive(Debug, Clone)]
pub struct JobContext {
    pub worker_index: usize,
    pub correlation_id: Uuid,
    pub device_id: Option<String>,
    pub enqueued_at: DateTime<Utc>,
    pub stale_at: DateTime<Utc>,
}

impl JobContext {
    pub fn new(
        worker_index: usize,
        device_id: Option<String>,
        enqueued_at: DateTime<Utc>,
        stale_at: DateTime<Utc>,
    ) -> Self {
        Self {
            worker_index,
            correlation_id: Uuid::new_v4(),
            device_id,
            enqueued_at,
            stale_at,
        }
    }
}

/// A unit of work. Outcomes are logged, never returned.
#[async_trait]
pub trait Job: Send + Sync {
    fn description(&self) -> String;

    /// Device the job targets, used for log correlation
    fn device_id(&self) -> Option<String> {
        None
    }

    async fn execute(&self, ctx: &JobContext);
}
