use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use cron::Schedule;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use super::{ScheduledWorker, SchedulerError};

struct ScheduledJob {
    worker: Arc<dyn ScheduledWorker>,
    schedule: Schedule,
}

/// Fires registered workers on their cron schedules.
pub struct WorkerScheduler {
    jobs: Vec<ScheduledJob>,
    running: Arc<AtomicBool>,
    failed_runs: Arc<AtomicUsize>,
    shutdown_tx: broadcast::Sender<()>,
}

impl Default for WorkerScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkerScheduler {
    pub fn new() -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            jobs: Vec::new(),
            running: Arc::new(AtomicBool::new(false)),
            failed_runs: Arc::new(AtomicUsize::new(0)),
            shutdown_tx,
        }
    }

    /// Register a worker. Fails if its schedule does not parse.
    pub fn add(&mut self, worker: Arc<dyn ScheduledWorker>) -> Result<(), SchedulerError> {
        let expression = worker.schedule();
        let schedule =
            Schedule::from_str(&expression).map_err(|e| SchedulerError::InvalidSchedule {
                worker: worker.name().to_string(),
                schedule: expression.clone(),
                message: e.to_string(),
            })?;

        info!(worker = worker.name(), schedule = %expression, "Registered scheduled worker");
        self.jobs.push(ScheduledJob { worker, schedule });
        Ok(())
    }

    /// Number of registered workers.
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Number of scheduled runs that returned an error.
    pub fn failed_runs(&self) -> usize {
        self.failed_runs.load(Ordering::Relaxed)
    }

    /// Start one loop per registered worker.
    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Scheduler already running");
            return;
        }

        info!(workers = self.jobs.len(), "Starting worker scheduler");

        for job in &self.jobs {
            self.spawn_job_loop(Arc::clone(&job.worker), job.schedule.clone());
        }
    }

    /// Stop all loops. Runs already in progress finish on their own.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("Scheduler not running");
            return;
        }

        info!("Stopping worker scheduler");
        let _ = self.shutdown_tx.send(());
    }

    fn spawn_job_loop(&self, worker: Arc<dyn ScheduledWorker>, schedule: Schedule) {
        let running = Arc::clone(&self.running);
        let failed_runs = Arc::clone(&self.failed_runs);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let name = worker.name().to_string();
            info!(worker = %name, "Scheduler loop started");

            loop {
                let Some(next) = schedule.upcoming(Utc).next() else {
                    warn!(worker = %name, "Schedule has no upcoming runs");
                    break;
                };
                let wait = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);
                debug!(worker = %name, next = %next, "Next scheduled run");

                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!(worker = %name, "Scheduler loop received shutdown signal");
                        break;
                    }
                    _ = tokio::time::sleep(wait) => {
                        if !running.load(Ordering::Relaxed) {
                            break;
                        }

                        let now = Utc::now();
                        if !worker.ready(now) {
                            debug!(worker = %name, "Worker not ready, skipping tick");
                            continue;
                        }

                        let worker = Arc::clone(&worker);
                        let failed_runs = Arc::clone(&failed_runs);
                        tokio::spawn(async move {
                            if let Err(e) = worker.execute().await {
                                failed_runs.fetch_add(1, Ordering::Relaxed);
                                error!(worker = worker.name(), error = %e, "Scheduled run failed");
                            }
                        });
                    }
                }
            }

            info!(worker = %name, "Scheduler loop stopped");
        });
    }
}
