//! Staleness-aware bounded worker pool
//!
//! Jobs are enqueued with a staleness budget. An insertion attempt that
//! cannot enter the bounded queue within the budget is dropped, and a
//! worker skips items whose deadline passed while they waited in the queue.

pub mod job;
pub mod pool;

pub use job::{Job, JobContext};
pub use pool::WorkerPool;
