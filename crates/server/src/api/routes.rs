use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::{carriers, handlers, middleware::metrics_middleware, shipments, worker};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Shipments
        .route("/shipments", post(shipments::create_shipment))
        .route("/shipments", get(shipments::list_shipments))
        .route("/shipments/{id}", get(shipments::get_shipment))
        // Carriers
        .route("/carriers", get(carriers::list_carriers))
        // Tracking worker
        .route("/worker/status", get(worker::get_status))
        .route("/worker/run", post(worker::run_cycle))
        .layer(middleware::from_fn(metrics_middleware))
        .with_state(Arc::clone(&state));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
