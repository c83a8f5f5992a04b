use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use metrics::{counter, histogram};
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, trace, warn, Instrument};

use crate::job::{Job, JobContext};

struct WorkItem {
    job: Box<dyn Job>,
    enqueued_at: DateTime<Utc>,
    stale_at: DateTime<Utc>,
    stale_deadline: Instant,
}

/// Fixed set of workers draining one bounded queue.
///
/// Clones share the queue, so jobs holding a clone re-enqueue into the
/// same pool.
#[derive(Clone)]
pub struct WorkerPool {
    sender: mpsc::Sender<WorkItem>,
    worker_count: usize,
    queue_capacity: usize,
    handles: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl WorkerPool {
    /// Start `worker_count` workers. Workers stop taking new items once
    /// `shutdown_rx` fires; an in-flight job always runs to completion.
    pub fn new(
        worker_count: usize,
        queue_capacity: usize,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Self {
        let worker_count = worker_count.max(1);
        let queue_capacity = queue_capacity.max(1);
        let (sender, receiver) = mpsc::channel(queue_capacity);
        let receiver = Arc::new(Mutex::new(receiver));

        let handles = (0..worker_count)
            .map(|worker_index| {
                let receiver = Arc::clone(&receiver);
                let shutdown_rx = shutdown_rx.resubscribe();
                tokio::spawn(run_worker(worker_index, receiver, shutdown_rx))
            })
            .collect();

        info!(worker_count, queue_capacity, "Worker pool started");

        Self {
            sender,
            worker_count,
            queue_capacity,
            handles: Arc::new(Mutex::new(handles)),
        }
    }

    /// Fire-and-forget enqueue. The insertion attempt runs on its own task
    /// and gives up once `stale_after` elapses with the queue still full.
    pub fn enqueue(&self, job: Box<dyn Job>, stale_after: Duration) {
        let pool = self.clone();
        tokio::spawn(async move {
            pool.enqueue_or_let_stale(job, stale_after).await;
        });
    }

    /// Awaitable form of the insertion attempt. Returns whether the job
    /// entered the queue.
    pub async fn enqueue_or_let_stale(&self, job: Box<dyn Job>, stale_after: Duration) -> bool {
        let enqueued_at = Utc::now();
        let stale_at = chrono::Duration::from_std(stale_after)
            .ok()
            .and_then(|d| enqueued_at.checked_add_signed(d))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let description = job.description();

        let now = Instant::now();
        let item = WorkItem {
            job,
            enqueued_at,
            stale_at,
            stale_deadline: now.checked_add(stale_after).unwrap_or_else(|| far_future(now)),
        };

        match tokio::time::timeout(stale_after, self.sender.send(item)).await {
            Ok(Ok(())) => {
                trace!(job = %description, "Job entered thread pool");
                counter!("telemetry_pool_jobs_enqueued_total").increment(1);
                true
            }
            Ok(Err(_)) => {
                warn!(job = %description, "Worker pool is closed, dropping job");
                counter!("telemetry_pool_jobs_dropped_total", "reason" => "closed").increment(1);
                false
            }
            Err(_) => {
                trace!(job = %description, "Job turned stale before entering thread pool, dropping");
                counter!("telemetry_pool_jobs_dropped_total", "reason" => "stale_enqueue")
                    .increment(1);
                false
            }
        }
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }

    /// Items currently waiting in the queue
    pub fn queued(&self) -> usize {
        self.queue_capacity - self.sender.capacity()
    }

    /// Wait for every worker to exit. Only returns after shutdown fired.
    pub async fn join(&self) {
        let handles = std::mem::take(&mut *self.handles.lock().await);
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "Worker task ended abnormally");
            }
        }
    }
}

// Roughly 30 years
fn far_future(now: Instant) -> Instant {
    now + Duration::from_secs(86400 * 365 * 30)
}

async fn run_worker(
    worker_index: usize,
    receiver: Arc<Mutex<mpsc::Receiver<WorkItem>>>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    loop {
        let next = tokio::select! {
            _ = shutdown_rx.recv() => {
                debug!(worker_index, "Worker received shutdown signal");
                break;
            }
            item = async { receiver.lock().await.recv().await } => item,
        };

        let Some(item) = next else {
            debug!(worker_index, "Job queue closed, worker exiting");
            break;
        };

        if Instant::now() > item.stale_deadline {
            debug!(worker_index, job = %item.job.description(), "Job is stale, skipping");
            counter!("telemetry_pool_jobs_dropped_total", "reason" => "stale_dequeue")
                .increment(1);
            continue;
        }

        execute_item(worker_index, item).await;
    }
}

async fn execute_item(worker_index: usize, item: WorkItem) {
    let ctx = JobContext::new(
        worker_index,
        item.job.device_id(),
        item.enqueued_at,
        item.stale_at,
    );
    let description = item.job.description();
    let span = tracing::info_span!(
        "job",
        worker_index,
        correlation_id = %ctx.correlation_id,
        device_id = ctx.device_id.as_deref().unwrap_or(""),
    );

    async {
        trace!(job = %description, "Starting job");
        let started = Instant::now();

        if AssertUnwindSafe(item.job.execute(&ctx))
            .catch_unwind()
            .await
            .is_err()
        {
            error!(job = %description, "Job panicked; worker continues");
            counter!("telemetry_pool_jobs_panicked_total").increment(1);
        }

        let elapsed = started.elapsed();
        debug!(
            job = %description,
            duration_ms = elapsed.as_millis() as u64,
            "Job finished"
        );
        counter!("telemetry_pool_jobs_executed_total").increment(1);
        histogram!("telemetry_pool_job_duration_seconds").record(elapsed.as_secs_f64());
    }
    .instrument(span)
    .await;
}
