use crate::handlers::{active_users, diagnostics, generate_user_id, get_initial_text, health_check, ready_check, release_user_id};
use crate::AppState;
use axum::{
    routing::{delete, get},
    Router,
};
use std::sync::Arc;

/// Create API routes
pub fn create_api_routes(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(ready_check))
        .route("/v1/users", get(active_users).post(generate_user_id))
        .route("/v1/users/:user_id", delete(release_user_id))
        .route("/v1/users/:user_id/initial-text", get(get_initial_text))
        .route("/v1/diagnostics", get(diagnostics))
        .with_state(app_state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::models::{BroadcastMessage, User};
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use pretty_assertions::assert_eq;
    use serde::de::DeserializeOwned;
    use tower::ServiceExt;

    async fn call(app: &Router, method: &str, uri: &str) -> (StatusCode, Vec<u8>) {
        let response = app
            .clone()
            .oneshot(Request::builder().method(method).uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    fn json<T: DeserializeOwned>(body: &[u8]) -> T {
        serde_json::from_slice(body).unwrap()
    }

    fn app(config: Config) -> (Arc<AppState>, Router) {
        let (state, _task) = AppState::new(config);
        (state.clone(), create_api_routes(state))
    }

    #[tokio::test]
    async fn issues_distinct_user_ids() {
        let (_, app) = app(Config::default());
        let (status, first) = call(&app, "POST", "/v1/users").await;
        assert_eq!(status, StatusCode::OK);
        let (_, second) = call(&app, "POST", "/v1/users").await;
        assert_ne!(json::<u64>(&first), json::<u64>(&second));

        let (_, users) = call(&app, "GET", "/v1/users").await;
        assert_eq!(json::<Vec<User>>(&users).len(), 2);
    }

    #[tokio::test]
    async fn release_is_idempotent() {
        let (state, app) = app(Config::default());
        let (_, body) = call(&app, "POST", "/v1/users").await;
        let id: u64 = json(&body);

        let (status, _) = call(&app, "DELETE", &format!("/v1/users/{id}")).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = call(&app, "DELETE", &format!("/v1/users/{id}")).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(!state.registry.is_active(id));
    }

    #[tokio::test]
    async fn initial_text_renders_current_document() {
        let config = Config { initial_text: "# Notes\n**todo**".to_string(), ..Config::default() };
        let (_, app) = app(config);

        let (status, body) = call(&app, "GET", "/v1/users/1/initial-text").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            json::<BroadcastMessage>(&body),
            BroadcastMessage::new("# Notes\n**todo**", "<h1>Notes</h1><strong>todo</strong>")
        );
    }

    #[tokio::test]
    async fn initial_text_follows_updates() {
        let (state, app) = app(Config::default());
        let mut rx = state.broadcaster.subscribe();
        state
            .broadcaster
            .submit(crate::models::UpdateMessage { content: "~~old~~ new".into(), sender_id: 1 })
            .await
            .unwrap();
        rx.recv().await.unwrap();

        let (_, body) = call(&app, "GET", "/v1/users/1/initial-text").await;
        assert_eq!(json::<BroadcastMessage>(&body), BroadcastMessage::new("~~old~~ new", "<del>old</del> new"));
    }

    #[tokio::test]
    async fn health_and_ready() {
        let (_, app) = app(Config::default());
        let (status, _) = call(&app, "GET", "/health").await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = call(&app, "GET", "/ready").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn diagnostics_reports_document_version() {
        let (_, app) = app(Config::default());
        let (status, body) = call(&app, "GET", "/v1/diagnostics").await;
        assert_eq!(status, StatusCode::OK);
        let value: serde_json::Value = json(&body);
        assert_eq!(value["doc_version"], 0);
        assert_eq!(value["n_conn"], 0);
    }
}
