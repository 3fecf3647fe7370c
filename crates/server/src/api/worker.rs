//! Tracking worker API handlers.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::sync::Arc;

use parcelwatch_core::CycleOutcome;

use crate::state::AppState;

/// Worker status response
#[derive(Debug, Serialize)]
pub struct WorkerStatusResponse {
    /// Whether the scheduler runs the worker
    pub enabled: bool,
    pub schedule: String,
    /// Whether a cycle is in progress
    pub busy: bool,
}

#[derive(Debug, Serialize)]
pub struct WorkerErrorResponse {
    pub error: String,
}

/// Get tracking worker status
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<WorkerStatusResponse> {
    let worker = state.worker();
    Json(WorkerStatusResponse {
        enabled: worker.config().enabled,
        schedule: worker.config().schedule.clone(),
        busy: worker.is_busy(),
    })
}

/// Run a tracking cycle now.
///
/// Returns 409 if a cycle is already running.
pub async fn run_cycle(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.worker().run_cycle().await {
        Ok(outcome @ CycleOutcome::Completed(_)) => (StatusCode::OK, Json(outcome)).into_response(),
        Ok(outcome @ CycleOutcome::AlreadyRunning) => {
            (StatusCode::CONFLICT, Json(outcome)).into_response()
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(WorkerErrorResponse {
                error: e.to_string(),
            }),
        )
            .into_response(),
    }
}
