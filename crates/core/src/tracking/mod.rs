//! Carrier tracking processors.
//!
//! Each carrier gets a processor that turns a shipment into a normalized
//! [`CarrierTrackingResult`]:
//! - **UPS**: OAuth client-credentials + REST tracking API
//! - **UDS**: anonymous fetch of the public tracking page + HTML extraction
//! - **Unsupported**: fallback for carriers without a processor
//!
//! Processors are resolved per carrier key through the [`ProcessorRegistry`].

mod registry;
mod types;
mod uds;
mod unsupported;
mod ups;

pub use registry::{ProcessorFactory, ProcessorRegistry, ProcessorResult};
pub use types::CarrierTrackingResult;
pub use uds::{UdsConfig, UdsTrackingProcessor};
pub use unsupported::UnsupportedTrackingProcessor;
pub use ups::{UpsConfig, UpsTrackingProcessor};

pub(crate) use types::local_datetime;

use async_trait::async_trait;
use thiserror::Error;

use crate::shipment::Shipment;

/// Errors that can occur while tracking a shipment with a carrier.
#[derive(Debug, Error)]
pub enum TrackingError {
    /// Transport failure: DNS, connect, timeout, body read.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Carrier answered with a non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Response or page could not be interpreted.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Processor is missing configuration (credentials, etc.).
    #[error("Processor not configured: {0}")]
    NotConfigured(String),

    /// Scraping carriers need the shipment's tracking page.
    #[error("Shipment {0} has no tracking URL")]
    MissingTrackingUrl(String),
}

/// A carrier-specific tracking strategy.
#[async_trait]
pub trait CarrierTrackingProcessor: Send + Sync {
    /// Query the carrier for the current state of a shipment.
    async fn process(&self, shipment: &Shipment) -> Result<CarrierTrackingResult, TrackingError>;

    /// Name used in logs and metrics.
    fn name(&self) -> &str;
}
