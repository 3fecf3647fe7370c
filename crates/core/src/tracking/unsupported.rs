use async_trait::async_trait;

use super::{CarrierTrackingProcessor, CarrierTrackingResult, TrackingError};
use crate::shipment::{status_keys, Shipment};

/// Fallback for carriers without a processor. Never fails.
#[derive(Debug, Default)]
pub struct UnsupportedTrackingProcessor;

impl UnsupportedTrackingProcessor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CarrierTrackingProcessor for UnsupportedTrackingProcessor {
    async fn process(&self, shipment: &Shipment) -> Result<CarrierTrackingResult, TrackingError> {
        Ok(CarrierTrackingResult::with_status(
            shipment.tracking_number.clone(),
            status_keys::UNSUPPORTED,
        ))
    }

    fn name(&self) -> &str {
        "unsupported"
    }
}
