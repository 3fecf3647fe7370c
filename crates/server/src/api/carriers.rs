//! Carrier API handlers.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::state::AppState;

/// A carrier and whether tracking is available for it.
#[derive(Debug, Serialize)]
pub struct CarrierResponse {
    pub key: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// False when shipments for this carrier end up `unsupported`.
    pub tracking_available: bool,
}

#[derive(Debug, Serialize)]
pub struct ListCarriersResponse {
    pub carriers: Vec<CarrierResponse>,
}

#[derive(Debug, Serialize)]
pub struct CarrierErrorResponse {
    pub error: String,
}

/// List known carriers.
pub async fn list_carriers(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ListCarriersResponse>, impl IntoResponse> {
    let registered = state.registry().carriers();

    match state.store().list_carriers() {
        Ok(carriers) => Ok(Json(ListCarriersResponse {
            carriers: carriers
                .into_iter()
                .map(|carrier| CarrierResponse {
                    tracking_available: registered.iter().any(|k| *k == carrier.key),
                    key: carrier.key,
                    label: carrier.label,
                    icon: carrier.icon,
                })
                .collect(),
        })),
        Err(e) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(CarrierErrorResponse {
                error: e.to_string(),
            }),
        )),
    }
}
