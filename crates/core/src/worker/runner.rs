//! Tracking worker implementation.
//!
//! One cycle fetches the open shipments, keeps those due for a check, and
//! checks each one in its own task:
//! processor lookup → carrier call → status lookup → merge → save.
//! A failing shipment is logged and left for the next cycle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::config::{TrackingPolicy, WorkerConfig};
use super::eligibility::should_check;
use super::reconcile::apply_tracking_result;
use crate::metrics;
use crate::scheduler::{ScheduledWorker, SchedulerError};
use crate::shipment::{Shipment, ShipmentStore, StoreError};
use crate::tracking::{ProcessorRegistry, TrackingError};

/// Errors that abort a whole cycle.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Failed to fetch open shipments: {0}")]
    Store(#[from] StoreError),
}

/// Errors that drop a single shipment's update.
#[derive(Debug, Error)]
pub enum ShipmentCheckError {
    #[error("Tracking failed: {0}")]
    Tracking(#[from] TrackingError),

    #[error("Unknown status '{key}': {source}")]
    UnknownStatus { key: String, source: StoreError },

    #[error("Failed to save shipment: {0}")]
    Save(StoreError),
}

/// Counts for one completed cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CycleSummary {
    /// Shipments with a non-final status.
    pub open: usize,
    /// Open shipments due for a check.
    pub eligible: usize,
    pub updated: usize,
    pub failed: usize,
}

/// Result of asking the worker to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CycleOutcome {
    /// Another cycle was in progress; nothing was done.
    AlreadyRunning,
    Completed(CycleSummary),
}

/// Clears the busy flag when a cycle ends, however it ends.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Periodically re-checks in-flight shipments against their carriers.
pub struct TrackingWorker {
    config: WorkerConfig,
    policy: TrackingPolicy,
    store: Arc<dyn ShipmentStore>,
    registry: Arc<ProcessorRegistry>,
    busy: AtomicBool,
}

impl TrackingWorker {
    pub fn new(
        config: WorkerConfig,
        store: Arc<dyn ShipmentStore>,
        registry: Arc<ProcessorRegistry>,
    ) -> Self {
        let policy = config.policy();
        Self {
            config,
            policy,
            store,
            registry,
            busy: AtomicBool::new(false),
        }
    }

    /// Whether a cycle is in progress.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Run one cycle unless one is already running.
    pub async fn run_cycle(&self) -> Result<CycleOutcome, WorkerError> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Tracking cycle already running");
            metrics::CYCLES_TOTAL.with_label_values(&["skipped"]).inc();
            return Ok(CycleOutcome::AlreadyRunning);
        }
        let _guard = BusyGuard(&self.busy);

        let start = Instant::now();
        let result = self.check_due_shipments(Utc::now()).await;
        metrics::CYCLE_DURATION.observe(start.elapsed().as_secs_f64());

        match &result {
            Ok(summary) => {
                metrics::CYCLES_TOTAL.with_label_values(&["completed"]).inc();
                info!(
                    open = summary.open,
                    eligible = summary.eligible,
                    updated = summary.updated,
                    failed = summary.failed,
                    "Tracking cycle completed"
                );
            }
            Err(e) => {
                metrics::CYCLES_TOTAL.with_label_values(&["failed"]).inc();
                error!(error = %e, "Tracking cycle failed");
            }
        }

        result.map(CycleOutcome::Completed)
    }

    async fn check_due_shipments(&self, now: DateTime<Utc>) -> Result<CycleSummary, WorkerError> {
        let open = self.store.open_shipments()?;
        metrics::OPEN_SHIPMENTS.set(open.len() as i64);

        let eligible: Vec<Shipment> = open
            .iter()
            .filter(|s| should_check(s, &self.policy, now))
            .cloned()
            .collect();

        let mut summary = CycleSummary {
            open: open.len(),
            eligible: eligible.len(),
            ..CycleSummary::default()
        };

        if eligible.is_empty() {
            info!(open = summary.open, "No shipments due for a tracking check");
            return Ok(summary);
        }

        info!(
            open = summary.open,
            eligible = summary.eligible,
            "Checking shipments"
        );

        let tasks = eligible.into_iter().map(|shipment| {
            let store = Arc::clone(&self.store);
            let registry = Arc::clone(&self.registry);
            let shipment_id = shipment.id;
            let tracking_number = shipment.tracking_number.clone();
            let carrier = shipment.carrier.key.clone();
            let handle = tokio::spawn(async move {
                check_shipment(shipment, store.as_ref(), registry.as_ref()).await
            });
            async move { (shipment_id, tracking_number, carrier, handle.await) }
        });

        for (shipment_id, tracking_number, carrier, joined) in join_all(tasks).await {
            let result = match joined {
                Ok(Ok(())) => {
                    summary.updated += 1;
                    "updated"
                }
                Ok(Err(e)) => {
                    warn!(
                        shipment_id,
                        tracking_number = %tracking_number,
                        carrier = %carrier,
                        error = %e,
                        "Shipment check failed"
                    );
                    summary.failed += 1;
                    "failed"
                }
                Err(e) => {
                    error!(
                        shipment_id,
                        tracking_number = %tracking_number,
                        carrier = %carrier,
                        error = %e,
                        "Shipment check task panicked"
                    );
                    summary.failed += 1;
                    "failed"
                }
            };
            metrics::SHIPMENT_CHECKS
                .with_label_values(&[carrier.as_str(), result])
                .inc();
        }

        Ok(summary)
    }
}

/// Check one shipment with its carrier and persist the result.
pub async fn check_shipment(
    mut shipment: Shipment,
    store: &dyn ShipmentStore,
    registry: &ProcessorRegistry,
) -> Result<(), ShipmentCheckError> {
    let processor = registry.get(&shipment.carrier.key);

    let start = Instant::now();
    let result = processor.process(&shipment).await;
    metrics::CARRIER_REQUEST_DURATION
        .with_label_values(&[processor.name()])
        .observe(start.elapsed().as_secs_f64());
    let result = result?;

    let status = store
        .get_status(&result.status)
        .map_err(|source| ShipmentCheckError::UnknownStatus {
            key: result.status.clone(),
            source,
        })?;

    apply_tracking_result(&mut shipment, &result, status);
    store
        .save_shipment(&shipment)
        .map_err(ShipmentCheckError::Save)?;

    debug!(
        shipment_id = shipment.id,
        tracking_number = %shipment.tracking_number,
        status = %shipment.status.key,
        "Shipment updated"
    );
    Ok(())
}

#[async_trait]
impl ScheduledWorker for TrackingWorker {
    fn name(&self) -> &str {
        "shipment-tracking"
    }

    fn schedule(&self) -> String {
        self.config.schedule.clone()
    }

    fn ready(&self, _now: DateTime<Utc>) -> bool {
        !self.is_busy()
    }

    async fn execute(&self) -> Result<(), SchedulerError> {
        // A skipped tick is not a failure.
        self.run_cycle()
            .await
            .map(|_| ())
            .map_err(|e| SchedulerError::RunFailed {
                worker: self.name().to_string(),
                message: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shipment::{status_keys, CreateShipmentRequest, SqliteShipmentStore};
    use crate::testing::{MockShipmentStore, MockTrackingProcessor};
    use crate::tracking::{ProcessorResult, UnsupportedTrackingProcessor};
    use std::time::Duration;

    fn registry_with(processor: Arc<MockTrackingProcessor>) -> Arc<ProcessorRegistry> {
        let mut registry = ProcessorRegistry::new(Arc::new(UnsupportedTrackingProcessor::new()));
        registry.register(
            "ups",
            Arc::new(move || -> ProcessorResult { Ok(processor.clone()) }),
        );
        Arc::new(registry)
    }

    fn create(store: &dyn ShipmentStore, tracking_number: &str) -> Shipment {
        store
            .create_shipment(CreateShipmentRequest {
                label: tracking_number.to_string(),
                tracking_number: tracking_number.to_string(),
                carrier: "ups".to_string(),
                tracking_url: None,
                thumbnail_url: None,
            })
            .unwrap()
    }

    #[tokio::test]
    async fn test_overlapping_cycle_is_noop() {
        let store = Arc::new(SqliteShipmentStore::in_memory().unwrap());
        create(&*store, "1Z1");
        let processor = Arc::new(MockTrackingProcessor::new("ups"));
        processor.set_delay(Duration::from_millis(200));

        let worker = Arc::new(TrackingWorker::new(
            WorkerConfig::default(),
            store,
            registry_with(Arc::clone(&processor)),
        ));

        let first = {
            let worker = Arc::clone(&worker);
            tokio::spawn(async move { worker.run_cycle().await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(worker.is_busy());
        assert!(!worker.ready(Utc::now()));
        let second = worker.run_cycle().await.unwrap();
        assert_eq!(second, CycleOutcome::AlreadyRunning);

        let first = first.await.unwrap().unwrap();
        assert!(matches!(first, CycleOutcome::Completed(s) if s.updated == 1));
        assert!(!worker.is_busy());
        assert_eq!(processor.call_count(), 1);
    }

    #[tokio::test]
    async fn test_unknown_status_key_drops_update() {
        let store = Arc::new(SqliteShipmentStore::in_memory().unwrap());
        let shipment = create(&*store, "1Z1");
        let processor = Arc::new(MockTrackingProcessor::new("ups"));
        processor.set_default_status("teleported");

        let worker = TrackingWorker::new(
            WorkerConfig::default(),
            Arc::clone(&store) as Arc<dyn ShipmentStore>,
            registry_with(processor),
        );

        let outcome = worker.run_cycle().await.unwrap();
        assert_eq!(
            outcome,
            CycleOutcome::Completed(CycleSummary {
                open: 1,
                eligible: 1,
                updated: 0,
                failed: 1,
            })
        );

        let stored = store.get_shipment(shipment.id).unwrap().unwrap();
        assert_eq!(stored.status.key, status_keys::UNCHECKED);
        assert!(stored.last_checked_at.is_none());
    }

    #[tokio::test]
    async fn test_nothing_due_returns_early() {
        let store = Arc::new(SqliteShipmentStore::in_memory().unwrap());
        let mut shipment = create(&*store, "1Z1");
        shipment.status = store.get_status(status_keys::IN_TRANSIT).unwrap();
        shipment.last_checked_at = Some(Utc::now());
        store.save_shipment(&shipment).unwrap();

        let processor = Arc::new(MockTrackingProcessor::new("ups"));
        let worker = TrackingWorker::new(
            WorkerConfig::default(),
            store,
            registry_with(Arc::clone(&processor)),
        );

        let outcome = worker.run_cycle().await.unwrap();
        assert_eq!(
            outcome,
            CycleOutcome::Completed(CycleSummary {
                open: 1,
                eligible: 0,
                updated: 0,
                failed: 0,
            })
        );
        assert_eq!(processor.call_count(), 0);
    }

    #[test]
    fn test_scheduled_worker_contract() {
        let store = Arc::new(SqliteShipmentStore::in_memory().unwrap());
        let config = WorkerConfig {
            schedule: "0 */5 * * * *".to_string(),
            ..WorkerConfig::default()
        };
        let worker = TrackingWorker::new(
            config,
            store,
            registry_with(Arc::new(MockTrackingProcessor::new("ups"))),
        );

        assert_eq!(worker.schedule(), "0 */5 * * * *");
        assert!(worker.ready(Utc::now()));
    }

    #[tokio::test]
    async fn test_open_shipments_failure_aborts_cycle() {
        let store = Arc::new(MockShipmentStore::new());
        create(&*store, "1Z1");
        store.fail_open_shipments(true);

        let processor = Arc::new(MockTrackingProcessor::new("ups"));
        let worker = TrackingWorker::new(
            WorkerConfig::default(),
            Arc::clone(&store) as Arc<dyn ShipmentStore>,
            registry_with(Arc::clone(&processor)),
        );

        let err = worker.run_cycle().await.unwrap_err();
        assert!(matches!(err, WorkerError::Store(StoreError::Database(_))));
        assert!(!worker.is_busy());
        assert_eq!(processor.call_count(), 0);

        let err = worker.execute().await.unwrap_err();
        assert!(matches!(err, SchedulerError::RunFailed { .. }));
        assert!(!worker.is_busy());

        // The next cycle runs normally once the store recovers.
        store.fail_open_shipments(false);
        let outcome = worker.run_cycle().await.unwrap();
        assert!(matches!(outcome, CycleOutcome::Completed(s) if s.updated == 1));
        assert!(worker.execute().await.is_ok());
    }

    #[tokio::test]
    async fn test_save_failure_only_drops_that_shipment() {
        let store = Arc::new(MockShipmentStore::new());
        let first = create(&*store, "1ZA");
        let broken = create(&*store, "1ZB");
        let last = create(&*store, "1ZC");
        store.fail_save_for(broken.id);

        let registry = registry_with(Arc::new(MockTrackingProcessor::new("ups")));
        let worker = TrackingWorker::new(
            WorkerConfig::default(),
            Arc::clone(&store) as Arc<dyn ShipmentStore>,
            Arc::clone(&registry),
        );

        let outcome = worker.run_cycle().await.unwrap();
        assert_eq!(
            outcome,
            CycleOutcome::Completed(CycleSummary {
                open: 3,
                eligible: 3,
                updated: 2,
                failed: 1,
            })
        );

        for shipment in [&first, &last] {
            let stored = store.get_shipment(shipment.id).unwrap().unwrap();
            assert_eq!(stored.status.key, status_keys::IN_TRANSIT);
            assert!(stored.last_checked_at.is_some());
        }
        let stored = store.get_shipment(broken.id).unwrap().unwrap();
        assert_eq!(stored.status.key, status_keys::UNCHECKED);
        assert!(stored.last_checked_at.is_none());

        let err = check_shipment(stored, &*store, &registry)
            .await
            .unwrap_err();
        assert!(matches!(err, ShipmentCheckError::Save(StoreError::Database(_))));
    }
}
