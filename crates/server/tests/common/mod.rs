//! Common test utilities for API testing with mocks.
//!
//! Builds an in-process router backed by a temporary SQLite store and a mock
//! UPS processor, so requests run without network access.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use parcelwatch_core::{
    testing::MockTrackingProcessor, CarriersConfig, Config, DatabaseConfig, ProcessorRegistry,
    ProcessorResult, ServerConfig, ShipmentStore, SqliteShipmentStore, TrackingWorker,
    UnsupportedTrackingProcessor, UpsConfig, WorkerConfig,
};
use parcelwatch_server::{api::create_router, state::AppState};

/// Secret used in the fixture config; must never appear in responses.
pub const UPS_SECRET: &str = "fixture-client-secret";

/// Test fixture with a real store and a controllable UPS processor.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_shipment_creation() {
///     let fixture = TestFixture::new();
///
///     let response = fixture.post("/api/v1/shipments", json!({
///         "label": "Keyboard",
///         "tracking_number": "1Z999",
///         "carrier": "ups"
///     })).await;
///
///     assert_eq!(response.status, 201);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock UPS processor - configure tracking results
    pub ups: Arc<MockTrackingProcessor>,
    pub store: Arc<SqliteShipmentStore>,
    /// Temporary directory for the test database
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");

        let config = Config {
            server: ServerConfig {
                host: std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
                port: 0, // Not used for in-process testing
            },
            database: DatabaseConfig {
                path: db_path.clone(),
            },
            worker: WorkerConfig {
                // Cycles are triggered through the API only
                enabled: false,
                ..WorkerConfig::default()
            },
            carriers: CarriersConfig {
                ups: Some(UpsConfig {
                    base_url: "http://127.0.0.1:9".to_string(),
                    client_id: "fixture-client".to_string(),
                    client_secret: UPS_SECRET.to_string(),
                    timeout_secs: 5,
                    transaction_src: "parcelwatch".to_string(),
                    home_country: "US".to_string(),
                }),
                ..CarriersConfig::default()
            },
        };

        let store = Arc::new(
            SqliteShipmentStore::new(&db_path).expect("Failed to create shipment store"),
        );
        let ups = Arc::new(MockTrackingProcessor::new("ups"));

        let mut registry = ProcessorRegistry::new(Arc::new(UnsupportedTrackingProcessor::new()));
        let processor = Arc::clone(&ups);
        registry.register(
            "ups",
            Arc::new(move || -> ProcessorResult { Ok(processor.clone()) }),
        );
        let registry = Arc::new(registry);

        let worker = Arc::new(TrackingWorker::new(
            config.worker.clone(),
            Arc::clone(&store) as Arc<dyn ShipmentStore>,
            Arc::clone(&registry),
        ));

        let state = Arc::new(AppState::new(
            config,
            Arc::clone(&store) as Arc<dyn ShipmentStore>,
            registry,
            worker,
        ));

        Self {
            router: create_router(state),
            ups,
            store,
            temp_dir,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a POST request without a body.
    pub async fn post_empty(&self, path: &str) -> TestResponse {
        self.request("POST", path, None).await
    }

    /// GET a non-JSON endpoint and return the raw body.
    pub async fn get_text(&self, path: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        (status, String::from_utf8_lossy(&bytes).to_string())
    }

    /// Register a shipment through the API and return its JSON.
    pub async fn create_shipment(&self, tracking_number: &str, carrier: &str) -> Value {
        let response = self
            .post(
                "/api/v1/shipments",
                serde_json::json!({
                    "label": format!("Package {}", tracking_number),
                    "tracking_number": tracking_number,
                    "carrier": carrier,
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.body
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
