//! Mock shipment store for testing.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::shipment::{
    CreateShipmentRequest, Shipment, ShipmentCarrier, ShipmentStatus, ShipmentStore,
    SqliteShipmentStore, StoreError,
};

/// Shipment store backed by in-memory SQLite with switchable failures.
///
/// Every call is delegated to the inner store unless a failure is armed:
/// - `fail_open_shipments` makes the open-shipment query fail
/// - `fail_save_for` makes saves of the given shipment ids fail
///
/// # Example
///
/// ```rust,ignore
/// use parcelwatch_core::testing::MockShipmentStore;
///
/// let store = MockShipmentStore::new();
/// let shipment = store.create_shipment(request)?;
/// store.fail_save_for(shipment.id);
/// ```
pub struct MockShipmentStore {
    inner: SqliteShipmentStore,
    fail_open: AtomicBool,
    failing_saves: Mutex<HashSet<i64>>,
}

impl Default for MockShipmentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MockShipmentStore {
    pub fn new() -> Self {
        Self {
            inner: SqliteShipmentStore::in_memory().expect("in-memory store"),
            fail_open: AtomicBool::new(false),
            failing_saves: Mutex::new(HashSet::new()),
        }
    }

    /// Make `open_shipments` fail (or succeed again).
    pub fn fail_open_shipments(&self, fail: bool) {
        self.fail_open.store(fail, Ordering::SeqCst);
    }

    /// Make every save of shipment `id` fail.
    pub fn fail_save_for(&self, id: i64) {
        self.failing_saves.lock().unwrap().insert(id);
    }
}

impl ShipmentStore for MockShipmentStore {
    fn open_shipments(&self) -> Result<Vec<Shipment>, StoreError> {
        if self.fail_open.load(Ordering::SeqCst) {
            return Err(StoreError::Database("database is locked".to_string()));
        }
        self.inner.open_shipments()
    }

    fn get_status(&self, key: &str) -> Result<ShipmentStatus, StoreError> {
        self.inner.get_status(key)
    }

    fn save_shipment(&self, shipment: &Shipment) -> Result<(), StoreError> {
        if self.failing_saves.lock().unwrap().contains(&shipment.id) {
            return Err(StoreError::Database(format!(
                "disk I/O error saving shipment {}",
                shipment.id
            )));
        }
        self.inner.save_shipment(shipment)
    }

    fn list_shipments(&self) -> Result<Vec<Shipment>, StoreError> {
        self.inner.list_shipments()
    }

    fn get_shipment(&self, id: i64) -> Result<Option<Shipment>, StoreError> {
        self.inner.get_shipment(id)
    }

    fn list_carriers(&self) -> Result<Vec<ShipmentCarrier>, StoreError> {
        self.inner.list_carriers()
    }

    fn create_shipment(&self, request: CreateShipmentRequest) -> Result<Shipment, StoreError> {
        self.inner.create_shipment(request)
    }
}
