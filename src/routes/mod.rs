pub mod api;

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method},
    routing::get,
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::Config;
use crate::docs::ApiDoc;
use crate::websocket::websocket_handler;
use crate::AppState;

pub use api::create_api_routes;

/// Path clients open their pub/sub socket on
pub const WEBSOCKET_PATH: &str = "/create-ws-connection";

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origin_list()
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    if !origins.is_empty() {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([Method::GET, Method::POST, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE])
    } else if config.is_development() {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
    }
}

/// The complete application: REST API, socket endpoint and Swagger UI
pub fn create_app(app_state: Arc<AppState>) -> Router {
    let ws_routes = Router::new()
        .route(WEBSOCKET_PATH, get(websocket_handler))
        .with_state(app_state.clone());

    Router::new()
        // Mount API routes
        .nest("/api", create_api_routes(app_state.clone()))
        .merge(ws_routes)
        // Mount Swagger UI
        .merge(SwaggerUi::new("/swagger").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors_layer(&app_state.config))
        // Add tracing layer
        .layer(TraceLayer::new_for_http())
}
