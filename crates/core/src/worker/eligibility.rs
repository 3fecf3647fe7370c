//! Decides which shipments are due for a tracking check.

use chrono::{DateTime, Utc};

use super::config::TrackingPolicy;
use crate::shipment::{status_keys, Shipment};

/// Whether `shipment` should be checked at `now`.
///
/// Final shipments are never checked. Unchecked ones always are. Anything
/// not checked within `stale_after` is refreshed. Otherwise a shipment is
/// polled more densely once its delivery window end is within
/// `soon_threshold` (or already passed), but never more often than
/// `recheck_delay`.
pub fn should_check(shipment: &Shipment, policy: &TrackingPolicy, now: DateTime<Utc>) -> bool {
    if shipment.status.is_final {
        return false;
    }

    let last_checked_at = match shipment.last_checked_at {
        Some(at) if shipment.status.key != status_keys::UNCHECKED => at,
        _ => return true,
    };

    let since_last_check = now - last_checked_at;
    if since_last_check > policy.stale_after {
        return true;
    }

    let Some(window_end) = shipment.delivery_window_end else {
        return false;
    };

    let until_expected = window_end - now;
    until_expected < policy.soon_threshold && since_last_check > policy.recheck_delay
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 9, 12, 0, 0).unwrap()
    }

    fn policy() -> TrackingPolicy {
        TrackingPolicy {
            stale_after: Duration::hours(24),
            soon_threshold: Duration::hours(2),
            recheck_delay: Duration::minutes(15),
        }
    }

    fn checked(status_key: &str, ago: Duration) -> Shipment {
        let mut shipment = fixtures::shipment(1, "ups", status_key);
        shipment.last_checked_at = Some(now() - ago);
        shipment
    }

    #[test]
    fn test_final_status_never_checked() {
        for key in [
            status_keys::DELIVERED,
            status_keys::RETURNED,
            status_keys::CANCELLED,
        ] {
            // Never checked, stale, and overdue: still skipped.
            let mut shipment = fixtures::shipment(1, "ups", key);
            assert!(!should_check(&shipment, &policy(), now()));

            shipment.last_checked_at = Some(now() - Duration::days(30));
            shipment.delivery_window_end = Some(now() - Duration::hours(1));
            assert!(!should_check(&shipment, &policy(), now()));
        }
    }

    #[test]
    fn test_never_checked_is_due() {
        let shipment = fixtures::shipment(1, "ups", status_keys::IN_TRANSIT);
        assert!(shipment.last_checked_at.is_none());
        assert!(should_check(&shipment, &policy(), now()));
    }

    #[test]
    fn test_unchecked_status_is_due_even_if_recently_checked() {
        let shipment = checked(status_keys::UNCHECKED, Duration::minutes(1));
        assert!(should_check(&shipment, &policy(), now()));
    }

    #[test]
    fn test_stale_check_is_due_regardless_of_window() {
        let mut shipment = checked(status_keys::IN_TRANSIT, Duration::hours(25));
        assert!(should_check(&shipment, &policy(), now()));

        shipment.delivery_window_end = Some(now() + Duration::days(5));
        assert!(should_check(&shipment, &policy(), now()));
    }

    #[test]
    fn test_fresh_check_without_window_is_not_due() {
        let shipment = checked(status_keys::IN_TRANSIT, Duration::hours(3));
        assert!(!should_check(&shipment, &policy(), now()));
    }

    #[test]
    fn test_soon_delivery_respects_recheck_delay() {
        let mut shipment = checked(status_keys::OUT_FOR_DELIVERY, Duration::minutes(10));
        shipment.delivery_window_end = Some(now() + Duration::hours(1));
        assert!(!should_check(&shipment, &policy(), now()));
    }

    #[test]
    fn test_soon_delivery_after_recheck_delay_is_due() {
        let mut shipment = checked(status_keys::OUT_FOR_DELIVERY, Duration::minutes(20));
        shipment.delivery_window_end = Some(now() + Duration::hours(1));
        assert!(should_check(&shipment, &policy(), now()));
    }

    #[test]
    fn test_distant_delivery_is_not_due() {
        let mut shipment = checked(status_keys::IN_TRANSIT, Duration::hours(5));
        shipment.delivery_window_end = Some(now() + Duration::hours(3));
        assert!(!should_check(&shipment, &policy(), now()));
    }

    #[test]
    fn test_overdue_delivery_is_due() {
        let mut shipment = checked(status_keys::IN_TRANSIT, Duration::minutes(30));
        shipment.delivery_window_end = Some(now() - Duration::hours(4));
        assert!(should_check(&shipment, &policy(), now()));
    }

    #[test]
    fn test_custom_cadence() {
        let policy = TrackingPolicy {
            stale_after: Duration::hours(6),
            ..policy()
        };
        let shipment = checked(status_keys::IN_TRANSIT, Duration::hours(7));
        assert!(should_check(&shipment, &policy, now()));
    }
}
