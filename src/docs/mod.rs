use utoipa::OpenApi;
use crate::models::*;

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn health_check_doc() {}

/// Readiness check endpoint
#[utoipa::path(
    get,
    path = "/api/ready",
    responses(
        (status = 200, description = "Service is ready", body = HealthResponse),
        (status = 503, description = "Update broadcaster stopped", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn ready_check_doc() {}

/// Issue a new user id
#[utoipa::path(
    post,
    path = "/api/v1/users",
    responses(
        (status = 200, description = "Freshly issued user id", body = u64),
        (status = 503, description = "Id space exhausted", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn generate_user_id_doc() {}

/// List active users
#[utoipa::path(
    get,
    path = "/api/v1/users",
    responses(
        (status = 200, description = "Active users ordered by id", body = Vec<User>)
    )
)]
#[allow(dead_code)]
pub async fn active_users_doc() {}

/// Release a user id
#[utoipa::path(
    delete,
    path = "/api/v1/users/{user_id}",
    params(
        ("user_id" = u64, Path, description = "User id to release")
    ),
    responses(
        (status = 204, description = "Released, not active, or still held by a live connection")
    )
)]
#[allow(dead_code)]
pub async fn release_user_id_doc() {}

/// Current document with its rendered preview
#[utoipa::path(
    get,
    path = "/api/v1/users/{user_id}/initial-text",
    params(
        ("user_id" = u64, Path, description = "Requesting user")
    ),
    responses(
        (status = 200, description = "Document text and HTML", body = BroadcastMessage),
        (status = 500, description = "Rendering failed", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn initial_text_doc() {}

/// Server diagnostics
#[utoipa::path(
    get,
    path = "/api/v1/diagnostics",
    responses(
        (status = 200, description = "Connection, document and process statistics", body = DiagnosticsResponse)
    )
)]
#[allow(dead_code)]
pub async fn diagnostics_doc() {}

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check_doc,
        ready_check_doc,
        generate_user_id_doc,
        active_users_doc,
        release_user_id_doc,
        initial_text_doc,
        diagnostics_doc,
    ),
    components(
        schemas(
            HealthResponse,
            ErrorResponse,
            User,
            BroadcastMessage,
            TextMessage,
            UpdateMessage,
            Document,
            RenderedView,
            DiagnosticsResponse
        )
    ),
    tags(
        (name = "api", description = "Collaborative Markdown editor API")
    )
)]
pub struct ApiDoc;
