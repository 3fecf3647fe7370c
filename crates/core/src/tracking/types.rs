//! Types shared by carrier tracking processors.

use chrono::{DateTime, FixedOffset, Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Normalized output of a carrier tracking processor.
///
/// Timestamps keep the offset the carrier reported them in; reconciliation
/// converts them to UTC before they are stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarrierTrackingResult {
    /// Echo of the tracking number that was queried.
    pub tracking_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_window_start: Option<DateTime<FixedOffset>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_window_end: Option<DateTime<FixedOffset>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_checked_at: Option<DateTime<FixedOffset>>,
    /// Key in the shared status vocabulary.
    pub status: String,
}

impl CarrierTrackingResult {
    /// A result that only carries a status, checked now.
    pub fn with_status(tracking_number: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            tracking_number: tracking_number.into(),
            delivery_window_start: None,
            delivery_window_end: None,
            last_location: None,
            last_checked_at: Some(Local::now().fixed_offset()),
            status: status.into(),
        }
    }
}

/// Interpret a wall-clock time in the host's local time zone.
///
/// Returns `None` for times skipped by a DST transition; ambiguous times
/// resolve to the earlier instant.
pub(crate) fn local_datetime(naive: NaiveDateTime) -> Option<DateTime<FixedOffset>> {
    naive
        .and_local_timezone(Local)
        .earliest()
        .map(|dt| dt.fixed_offset())
}
