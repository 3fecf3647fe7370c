//! Shipment domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Well-known status keys of the shared status catalog.
///
/// Carrier processors normalise their own vocabulary into these keys. The
/// catalog itself lives in storage, so a key is only valid once it resolves
/// to a [`ShipmentStatus`] row.
pub mod status_keys {
    pub const UNCHECKED: &str = "unchecked";
    pub const PENDING: &str = "pending";
    pub const ACCEPTED: &str = "accepted";
    pub const IN_TRANSIT: &str = "in_transit";
    pub const OUT_FOR_DELIVERY: &str = "out_for_delivery";
    pub const DELAYED: &str = "delayed";
    pub const EXCEPTION: &str = "exception";
    pub const ATTEMPTED_DELIVERY: &str = "attempted_delivery";
    pub const RETURNED: &str = "returned";
    pub const DELIVERED: &str = "delivered";
    pub const CANCELLED: &str = "cancelled";
    pub const UNKNOWN: &str = "unknown";
    pub const UNSUPPORTED: &str = "unsupported";
}

/// A lifecycle stage in the status catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentStatus {
    pub id: i64,
    /// Stable key, e.g. `in_transit`.
    pub key: String,
    /// Display label.
    pub label: String,
    /// Terminal statuses are never checked again.
    pub is_final: bool,
}

/// A carrier a shipment travels with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentCarrier {
    pub id: i64,
    /// Key used to select a tracking processor, e.g. `ups`.
    pub key: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// A tracked package with its status and carrier resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shipment {
    pub id: i64,
    /// Human label, e.g. "New keyboard".
    pub label: String,
    pub tracking_number: String,
    /// Public tracking page, required by scraping carriers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_window_start: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_window_end: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_checked_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    pub status: ShipmentStatus,
    pub carrier: ShipmentCarrier,
}

/// Request to register a new shipment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateShipmentRequest {
    pub label: String,
    pub tracking_number: String,
    /// Key of an existing carrier.
    pub carrier: String,
    #[serde(default)]
    pub tracking_url: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
}
