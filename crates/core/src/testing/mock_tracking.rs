//! Mock tracking processor for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use crate::shipment::{status_keys, Shipment};
use crate::tracking::{CarrierTrackingProcessor, CarrierTrackingResult, TrackingError};

#[derive(Debug, Clone)]
enum MockResponse {
    Result(CarrierTrackingResult),
    Failure { status: u16, message: String },
}

/// Mock implementation of the CarrierTrackingProcessor trait.
///
/// Provides controllable behavior for testing:
/// - Canned results or failures per tracking number
/// - A default status for everything else
/// - Recorded calls for assertions
/// - Simulated latency
///
/// # Example
///
/// ```rust,ignore
/// use parcelwatch_core::testing::MockTrackingProcessor;
///
/// let processor = MockTrackingProcessor::new("ups");
/// processor.set_failure("1ZBROKEN", 503, "unavailable");
///
/// let result = processor.process(&shipment).await?;
/// assert_eq!(processor.processed(), vec![shipment.tracking_number]);
/// ```
#[derive(Debug)]
pub struct MockTrackingProcessor {
    name: String,
    default_status: Mutex<String>,
    responses: Mutex<HashMap<String, MockResponse>>,
    processed: Mutex<Vec<String>>,
    delay: Mutex<Duration>,
}

impl MockTrackingProcessor {
    /// Create a mock that reports `in_transit` for every shipment.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default_status: Mutex::new(status_keys::IN_TRANSIT.to_string()),
            responses: Mutex::new(HashMap::new()),
            processed: Mutex::new(Vec::new()),
            delay: Mutex::new(Duration::ZERO),
        }
    }

    /// Status reported for tracking numbers without a canned response.
    pub fn set_default_status(&self, status: &str) {
        *self.default_status.lock().unwrap() = status.to_string();
    }

    /// Return `result` for its tracking number.
    pub fn set_result(&self, result: CarrierTrackingResult) {
        self.responses
            .lock()
            .unwrap()
            .insert(result.tracking_number.clone(), MockResponse::Result(result));
    }

    /// Fail with an API error for `tracking_number`.
    pub fn set_failure(&self, tracking_number: &str, status: u16, message: &str) {
        self.responses.lock().unwrap().insert(
            tracking_number.to_string(),
            MockResponse::Failure {
                status,
                message: message.to_string(),
            },
        );
    }

    /// Simulated latency of every call.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    /// Tracking numbers processed so far, in call order.
    pub fn processed(&self) -> Vec<String> {
        self.processed.lock().unwrap().clone()
    }

    /// Number of calls made.
    pub fn call_count(&self) -> usize {
        self.processed.lock().unwrap().len()
    }
}

#[async_trait]
impl CarrierTrackingProcessor for MockTrackingProcessor {
    async fn process(&self, shipment: &Shipment) -> Result<CarrierTrackingResult, TrackingError> {
        let tracking_number = shipment.tracking_number.clone();
        self.processed.lock().unwrap().push(tracking_number.clone());

        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let response = self.responses.lock().unwrap().get(&tracking_number).cloned();
        match response {
            Some(MockResponse::Result(result)) => Ok(result),
            Some(MockResponse::Failure { status, message }) => {
                Err(TrackingError::Api { status, message })
            }
            None => {
                let status = self.default_status.lock().unwrap().clone();
                Ok(CarrierTrackingResult::with_status(tracking_number, status))
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    #[tokio::test]
    async fn test_default_and_canned_responses() {
        let processor = MockTrackingProcessor::new("mock");
        processor.set_failure("BROKEN", 503, "unavailable");

        let ok = fixtures::shipment(1, "ups", status_keys::UNCHECKED);
        let mut broken = fixtures::shipment(2, "ups", status_keys::UNCHECKED);
        broken.tracking_number = "BROKEN".to_string();

        let result = processor.process(&ok).await.unwrap();
        assert_eq!(result.status, status_keys::IN_TRANSIT);

        let err = processor.process(&broken).await.unwrap_err();
        assert!(matches!(err, TrackingError::Api { status: 503, .. }));

        assert_eq!(processor.call_count(), 2);
        assert_eq!(processor.processed()[1], "BROKEN");
    }
}
