//! Shipments, their status catalog, and storage.

mod sqlite_store;
mod store;
mod types;

pub use sqlite_store::SqliteShipmentStore;
pub use store::{ShipmentStore, StoreError};
pub use types::{
    status_keys, CreateShipmentRequest, Shipment, ShipmentCarrier, ShipmentStatus,
};
