//! Shipment tracking worker.
//!
//! Each cycle re-checks the open shipments that are due (see
//! [`should_check`]) against their carriers, concurrently, and stores the
//! merged results. Cycles never overlap.

mod config;
mod eligibility;
mod reconcile;
mod runner;

pub use config::{TrackingPolicy, WorkerConfig};
pub use eligibility::should_check;
pub use reconcile::apply_tracking_result;
pub use runner::{
    check_shipment, CycleOutcome, CycleSummary, ShipmentCheckError, TrackingWorker, WorkerError,
};
