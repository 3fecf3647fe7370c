use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::{info, warn};

use super::{
    CarrierTrackingProcessor, TrackingError, UdsTrackingProcessor, UnsupportedTrackingProcessor,
    UpsTrackingProcessor,
};
use crate::config::CarriersConfig;

/// Builds the processor for one carrier key.
pub type ProcessorFactory = Arc<dyn Fn() -> ProcessorResult + Send + Sync>;

pub type ProcessorResult = Result<Arc<dyn CarrierTrackingProcessor>, TrackingError>;

/// Lazily constructed, cached processors keyed by carrier.
///
/// A processor is built on the first `get` for its key and reused for the
/// lifetime of the registry. Keys without a factory, and factories that
/// fail, resolve to the fallback processor.
pub struct ProcessorRegistry {
    factories: HashMap<String, ProcessorFactory>,
    processors: Mutex<HashMap<String, Arc<dyn CarrierTrackingProcessor>>>,
    fallback: Arc<dyn CarrierTrackingProcessor>,
}

impl ProcessorRegistry {
    pub fn new(fallback: Arc<dyn CarrierTrackingProcessor>) -> Self {
        Self {
            factories: HashMap::new(),
            processors: Mutex::new(HashMap::new()),
            fallback,
        }
    }

    /// Registry with the built-in carriers (`ups`, `uds`).
    pub fn from_config(config: &CarriersConfig) -> Self {
        let mut registry = Self::new(Arc::new(UnsupportedTrackingProcessor::new()));

        let ups = config.ups.clone();
        registry.register(
            "ups",
            Arc::new(move || -> ProcessorResult {
                let config = ups.clone().ok_or_else(|| {
                    TrackingError::NotConfigured("missing [carriers.ups] section".to_string())
                })?;
                Ok(Arc::new(UpsTrackingProcessor::new(config)?))
            }),
        );

        let uds = config.uds.clone();
        registry.register(
            "uds",
            Arc::new(move || -> ProcessorResult {
                Ok(Arc::new(UdsTrackingProcessor::new(uds.clone())?))
            }),
        );

        registry
    }

    /// Register (or replace) the factory for a carrier key.
    pub fn register(&mut self, carrier: impl Into<String>, factory: ProcessorFactory) {
        self.factories.insert(carrier.into(), factory);
    }

    /// Carrier keys with a registered factory.
    pub fn carriers(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.factories.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Processor for a carrier key. Never fails.
    pub fn get(&self, carrier: &str) -> Arc<dyn CarrierTrackingProcessor> {
        let mut processors = match self.processors.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(processor) = processors.get(carrier) {
            return Arc::clone(processor);
        }

        let processor = match self.factories.get(carrier) {
            Some(factory) => match factory() {
                Ok(processor) => {
                    info!(carrier, processor = processor.name(), "Initialized tracking processor");
                    processor
                }
                Err(e) => {
                    warn!(
                        carrier,
                        error = %e,
                        "Failed to initialize tracking processor, using fallback"
                    );
                    Arc::clone(&self.fallback)
                }
            },
            None => {
                warn!(carrier, "No tracking processor registered, using fallback");
                Arc::clone(&self.fallback)
            }
        };

        processors.insert(carrier.to_string(), Arc::clone(&processor));
        processor
    }
}
