//! Shipment API handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use parcelwatch_core::{CreateShipmentRequest, Shipment, StoreError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for registering a shipment
#[derive(Debug, Deserialize)]
pub struct CreateShipmentBody {
    /// Human label, e.g. "New keyboard"
    pub label: String,
    pub tracking_number: String,
    /// Carrier key, e.g. "ups"
    pub carrier: String,
    /// Public tracking page (required for scraped carriers)
    pub tracking_url: Option<String>,
    pub thumbnail_url: Option<String>,
}

/// Response for listing shipments
#[derive(Debug, Serialize)]
pub struct ListShipmentsResponse {
    pub shipments: Vec<Shipment>,
    pub total: usize,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ShipmentErrorResponse {
    pub error: String,
}

fn error_response(
    status: StatusCode,
    error: impl Into<String>,
) -> (StatusCode, Json<ShipmentErrorResponse>) {
    (
        status,
        Json(ShipmentErrorResponse {
            error: error.into(),
        }),
    )
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// ============================================================================
// Handlers
// ============================================================================

/// Register a new shipment
pub async fn create_shipment(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateShipmentBody>,
) -> Result<(StatusCode, Json<Shipment>), impl IntoResponse> {
    let label = body.label.trim();
    let tracking_number = body.tracking_number.trim();
    if label.is_empty() || tracking_number.is_empty() {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "label and tracking_number are required",
        ));
    }

    let request = CreateShipmentRequest {
        label: label.to_string(),
        tracking_number: tracking_number.to_string(),
        carrier: body.carrier.trim().to_lowercase(),
        tracking_url: non_empty(body.tracking_url),
        thumbnail_url: non_empty(body.thumbnail_url),
    };

    match state.store().create_shipment(request) {
        Ok(shipment) => {
            tracing::info!(
                shipment_id = shipment.id,
                tracking_number = %shipment.tracking_number,
                carrier = %shipment.carrier.key,
                "Shipment registered"
            );
            Ok((StatusCode::CREATED, Json(shipment)))
        }
        Err(StoreError::NotFound(what)) => Err(error_response(
            StatusCode::BAD_REQUEST,
            format!("Unknown {}", what),
        )),
        Err(e) => Err(error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}

/// List all shipments, newest first
pub async fn list_shipments(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ListShipmentsResponse>, impl IntoResponse> {
    match state.store().list_shipments() {
        Ok(shipments) => Ok(Json(ListShipmentsResponse {
            total: shipments.len(),
            shipments,
        })),
        Err(e) => Err(error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}

/// Get a single shipment
pub async fn get_shipment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Shipment>, impl IntoResponse> {
    match state.store().get_shipment(id) {
        Ok(Some(shipment)) => Ok(Json(shipment)),
        Ok(None) => Err(error_response(
            StatusCode::NOT_FOUND,
            format!("Shipment {} not found", id),
        )),
        Err(e) => Err(error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}
