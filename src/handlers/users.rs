use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::error;

use crate::models::{ErrorResponse, User};
use crate::AppState;

/// Issue a fresh user id
pub async fn generate_user_id(
    State(app_state): State<Arc<AppState>>,
) -> Result<(StatusCode, Json<u64>), (StatusCode, Json<ErrorResponse>)> {
    match app_state.registry.generate_user_id() {
        Ok(id) => Ok((StatusCode::OK, Json(id))),
        Err(e) => {
            error!("Failed to issue user id: {}", e);
            Err(ErrorResponse::reply(StatusCode::SERVICE_UNAVAILABLE, e.to_string()))
        }
    }
}

/// List the active users
pub async fn active_users(State(app_state): State<Arc<AppState>>) -> Json<Vec<User>> {
    Json(app_state.registry.active_users())
}

/// Release a user id. Releasing twice is fine.
pub async fn release_user_id(State(app_state): State<Arc<AppState>>, Path(user_id): Path<u64>) -> StatusCode {
    app_state.registry.release_user_id(user_id);
    StatusCode::NO_CONTENT
}
