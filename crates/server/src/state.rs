use parcelwatch_core::{Config, ProcessorRegistry, SanitizedConfig, ShipmentStore, TrackingWorker};
use std::sync::Arc;

/// Shared application state
pub struct AppState {
    config: Config,
    store: Arc<dyn ShipmentStore>,
    registry: Arc<ProcessorRegistry>,
    worker: Arc<TrackingWorker>,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn ShipmentStore>,
        registry: Arc<ProcessorRegistry>,
        worker: Arc<TrackingWorker>,
    ) -> Self {
        Self {
            config,
            store,
            registry,
            worker,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn store(&self) -> &dyn ShipmentStore {
        self.store.as_ref()
    }

    pub fn registry(&self) -> &ProcessorRegistry {
        self.registry.as_ref()
    }

    pub fn worker(&self) -> &TrackingWorker {
        self.worker.as_ref()
    }
}
