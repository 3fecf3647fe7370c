pub mod config;
pub mod metrics;
pub mod scheduler;
pub mod shipment;
pub mod testing;
pub mod tracking;
pub mod worker;

pub use config::{
    load_config, load_config_from_str, validate_config, CarriersConfig, Config, ConfigError,
    DatabaseConfig, SanitizedConfig, ServerConfig,
};
pub use scheduler::{ScheduledWorker, SchedulerError, WorkerScheduler};
pub use shipment::{
    status_keys, CreateShipmentRequest, Shipment, ShipmentCarrier, ShipmentStatus, ShipmentStore,
    SqliteShipmentStore, StoreError,
};
pub use tracking::{
    CarrierTrackingProcessor, CarrierTrackingResult, ProcessorFactory, ProcessorRegistry,
    ProcessorResult, TrackingError, UdsConfig, UdsTrackingProcessor,
    UnsupportedTrackingProcessor, UpsConfig, UpsTrackingProcessor,
};
pub use worker::{
    apply_tracking_result, should_check, CycleOutcome, CycleSummary, ShipmentCheckError,
    TrackingPolicy, TrackingWorker, WorkerConfig, WorkerError,
};
