//! Testing utilities and mock implementations.
//!
//! This module provides a mock carrier tracking processor, a shipment store
//! with switchable failures and fixtures,
//! allowing the worker and API to be exercised without real carriers.
//!
//! # Example
//!
//! ```rust,ignore
//! use parcelwatch_core::testing::{fixtures, MockTrackingProcessor};
//!
//! let processor = MockTrackingProcessor::new("ups");
//! processor.set_default_status("out_for_delivery");
//!
//! let shipment = fixtures::shipment(1, "ups", "in_transit");
//! ```

mod mock_store;
mod mock_tracking;

pub use mock_store::MockShipmentStore;
pub use mock_tracking::MockTrackingProcessor;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::shipment::{status_keys, Shipment, ShipmentCarrier, ShipmentStatus};

    /// A catalog status. Delivered, returned and cancelled are final.
    pub fn status(key: &str) -> ShipmentStatus {
        let is_final = matches!(
            key,
            status_keys::DELIVERED | status_keys::RETURNED | status_keys::CANCELLED
        );
        ShipmentStatus {
            id: key.len() as i64,
            key: key.to_string(),
            label: key.replace('_', " "),
            is_final,
        }
    }

    /// A carrier with the key as its label.
    pub fn carrier(key: &str) -> ShipmentCarrier {
        ShipmentCarrier {
            id: key.len() as i64,
            key: key.to_string(),
            label: key.to_uppercase(),
            icon: None,
        }
    }

    /// A never-checked shipment in the given status.
    pub fn shipment(id: i64, carrier_key: &str, status_key: &str) -> Shipment {
        Shipment {
            id,
            label: format!("Package {}", id),
            tracking_number: format!("TN{:08}", id),
            tracking_url: None,
            delivery_window_start: None,
            delivery_window_end: None,
            last_location: None,
            last_checked_at: None,
            thumbnail_url: None,
            status: status(status_key),
            carrier: carrier(carrier_key),
        }
    }
}
