//! Shipment storage trait.

use thiserror::Error;

use super::{CreateShipmentRequest, Shipment, ShipmentCarrier, ShipmentStatus};

/// Error type for shipment storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No row matched the lookup.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Database error (constraint violation, connectivity, corrupt row).
    #[error("Database error: {0}")]
    Database(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

/// Trait for shipment storage backends.
///
/// Calls are blocking; the tracking worker invokes them from its tasks.
pub trait ShipmentStore: Send + Sync {
    /// Shipments whose status is not final, with status and carrier resolved.
    fn open_shipments(&self) -> Result<Vec<Shipment>, StoreError>;

    /// Look up a status by key. Fails with `NotFound` for unknown keys.
    fn get_status(&self, key: &str) -> Result<ShipmentStatus, StoreError>;

    /// Upsert a shipment by id.
    fn save_shipment(&self, shipment: &Shipment) -> Result<(), StoreError>;

    /// All shipments, newest first.
    fn list_shipments(&self) -> Result<Vec<Shipment>, StoreError>;

    /// Get a single shipment.
    fn get_shipment(&self, id: i64) -> Result<Option<Shipment>, StoreError>;

    /// All known carriers.
    fn list_carriers(&self) -> Result<Vec<ShipmentCarrier>, StoreError>;

    /// Register a new shipment in the `unchecked` status.
    fn create_shipment(&self, request: CreateShipmentRequest) -> Result<Shipment, StoreError>;
}
