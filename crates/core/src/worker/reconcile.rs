//! Merges carrier results into stored shipments.

use chrono::Utc;

use crate::shipment::{Shipment, ShipmentStatus};
use crate::tracking::CarrierTrackingResult;

/// Apply a tracking result to `shipment`.
///
/// The status is replaced. Location and timestamps are only overwritten when
/// the result carries them; timestamps are stored as UTC.
pub fn apply_tracking_result(
    shipment: &mut Shipment,
    result: &CarrierTrackingResult,
    status: ShipmentStatus,
) {
    shipment.status = status;

    if let Some(location) = &result.last_location {
        shipment.last_location = Some(location.clone());
    }
    if let Some(checked_at) = result.last_checked_at {
        shipment.last_checked_at = Some(checked_at.with_timezone(&Utc));
    }
    if let Some(start) = result.delivery_window_start {
        shipment.delivery_window_start = Some(start.with_timezone(&Utc));
    }
    if let Some(end) = result.delivery_window_end {
        shipment.delivery_window_end = Some(end.with_timezone(&Utc));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shipment::status_keys;
    use crate::testing::fixtures;
    use chrono::{FixedOffset, TimeZone};

    #[test]
    fn test_window_bounds_stored_as_utc() {
        let new_york = FixedOffset::west_opt(4 * 3600).unwrap();
        let start = new_york.with_ymd_and_hms(2025, 6, 9, 14, 0, 0).unwrap();
        let end = new_york.with_ymd_and_hms(2025, 6, 9, 19, 0, 0).unwrap();

        let mut shipment = fixtures::shipment(1, "ups", status_keys::IN_TRANSIT);
        let result = CarrierTrackingResult {
            tracking_number: shipment.tracking_number.clone(),
            delivery_window_start: Some(start),
            delivery_window_end: Some(end),
            last_location: Some("Louisville, KY".to_string()),
            last_checked_at: Some(start),
            status: status_keys::OUT_FOR_DELIVERY.to_string(),
        };

        apply_tracking_result(
            &mut shipment,
            &result,
            fixtures::status(status_keys::OUT_FOR_DELIVERY),
        );

        let stored_start = shipment.delivery_window_start.unwrap();
        let stored_end = shipment.delivery_window_end.unwrap();
        assert_eq!(stored_start, start);
        assert_eq!(stored_end, end);
        assert_eq!(stored_end, Utc.with_ymd_and_hms(2025, 6, 9, 23, 0, 0).unwrap());
        assert_eq!(stored_start.to_rfc3339(), "2025-06-09T18:00:00+00:00");
        assert_eq!(shipment.status.key, status_keys::OUT_FOR_DELIVERY);
        assert_eq!(shipment.last_location.as_deref(), Some("Louisville, KY"));
        assert_eq!(shipment.last_checked_at, Some(start.with_timezone(&Utc)));
    }

    #[test]
    fn test_absent_fields_keep_stored_values() {
        let mut shipment = fixtures::shipment(1, "uds", status_keys::IN_TRANSIT);
        let window_end = Utc.with_ymd_and_hms(2025, 6, 9, 20, 0, 0).unwrap();
        shipment.last_location = Some("MINNEAPOLIS, MN".to_string());
        shipment.delivery_window_end = Some(window_end);

        let result = CarrierTrackingResult::with_status(
            shipment.tracking_number.clone(),
            status_keys::UNKNOWN,
        );
        apply_tracking_result(&mut shipment, &result, fixtures::status(status_keys::UNKNOWN));

        assert_eq!(shipment.status.key, status_keys::UNKNOWN);
        assert_eq!(shipment.last_location.as_deref(), Some("MINNEAPOLIS, MN"));
        assert_eq!(shipment.delivery_window_end, Some(window_end));
        assert!(shipment.last_checked_at.is_some());
    }
}
