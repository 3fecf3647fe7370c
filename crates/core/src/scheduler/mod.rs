//! Cron-driven execution of background workers.
//!
//! A [`ScheduledWorker`] declares its cadence as a cron expression (with
//! seconds) and whether it can start a run right now. The
//! [`WorkerScheduler`] fires each worker on its schedule, skipping a tick
//! when the worker is not ready.

mod runner;

pub use runner::WorkerScheduler;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors from registering or running scheduled workers.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Invalid schedule '{schedule}' for worker {worker}: {message}")]
    InvalidSchedule {
        worker: String,
        schedule: String,
        message: String,
    },

    #[error("Worker {worker} run failed: {message}")]
    RunFailed { worker: String, message: String },
}

/// A background job run on a cron schedule.
#[async_trait]
pub trait ScheduledWorker: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Cron expression with seconds, e.g. `0 */30 * * * *`.
    fn schedule(&self) -> String;

    /// Whether a new run may start at `now`.
    fn ready(&self, now: DateTime<Utc>) -> bool;

    /// Run once. Returns after the run completes.
    async fn execute(&self) -> Result<(), SchedulerError>;
}
