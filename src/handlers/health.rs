use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use tracing::{debug, warn};

use crate::models::HealthResponse;
use crate::AppState;

/// Health check endpoint
pub async fn health_check(State(app_state): State<Arc<AppState>>) -> Json<HealthResponse> {
    debug!("Health check requested");
    Json(HealthResponse {
        status: "ok".to_string(),
        service: app_state.config.service_name.clone(),
        message: "Server is running".to_string(),
    })
}

/// Readiness check endpoint. Not ready once the update broadcaster is gone.
pub async fn ready_check(State(app_state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    debug!("Readiness check requested");
    let service = app_state.config.service_name.clone();

    if !app_state.broadcaster.is_running() {
        warn!("Readiness check failed: update broadcaster stopped");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse {
                status: "unavailable".to_string(),
                service,
                message: "Update broadcaster is not running".to_string(),
            }),
        );
    }

    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".to_string(),
            service,
            message: "Service is ready".to_string(),
        }),
    )
}
