use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::{debug, error};

use crate::models::{BroadcastMessage, ErrorResponse};
use crate::AppState;

/// Current document text with its rendered preview
pub async fn get_initial_text(
    State(app_state): State<Arc<AppState>>,
    Path(user_id): Path<u64>,
) -> Result<(StatusCode, Json<BroadcastMessage>), (StatusCode, Json<ErrorResponse>)> {
    if !app_state.registry.is_active(user_id) {
        debug!("Initial text requested by inactive user {}", user_id);
    }

    let (document, view) = app_state.store.snapshot().await;

    // The cached view may trail the document by one in-flight update
    let html = match view {
        Some(view) => view.html,
        None => match app_state.renderer.render(&document.content) {
            Ok(html) => html,
            Err(e) => {
                error!("Failed to render version {} for user {}: {}", document.version, user_id, e);
                return Err(ErrorResponse::reply(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
            }
        },
    };

    Ok((StatusCode::OK, Json(BroadcastMessage::new(document.content, html))))
}
