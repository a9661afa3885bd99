use serde_json::Value;
use tracing::debug;

use super::ClientError;
use crate::models::BroadcastMessage;
use crate::routes::WEBSOCKET_PATH;

/// Request/response calls against the server's HTTP API
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Socket URL for a user, derived from the HTTP base URL
    pub fn websocket_url(&self, user_id: u64) -> String {
        let base = if let Some(rest) = self.base_url.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = self.base_url.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            self.base_url.clone()
        };
        format!("{base}{WEBSOCKET_PATH}?userId={user_id}")
    }

    async fn json(&self, request: reqwest::RequestBuilder) -> Result<Value, ClientError> {
        let body = request.send().await?.error_for_status()?.text().await?;
        serde_json::from_str(&body).map_err(|e| ClientError::InvalidServerResponse(e.to_string()))
    }

    pub async fn generate_user_id(&self) -> Result<u64, ClientError> {
        let value = self.json(self.http.post(format!("{}/api/v1/users", self.base_url))).await?;
        let id = value
            .as_u64()
            .ok_or_else(|| ClientError::InvalidServerResponse(format!("expected a user id, got {value}")))?;
        debug!("Server issued user id {}", id);
        Ok(id)
    }

    pub async fn get_initial_text(&self, user_id: u64) -> Result<BroadcastMessage, ClientError> {
        let url = format!("{}/api/v1/users/{}/initial-text", self.base_url, user_id);
        parse_initial_text(&self.json(self.http.get(url)).await?)
    }
}

/// Pull `original.content` and `html` out of an initial-text reply
pub(crate) fn parse_initial_text(value: &Value) -> Result<BroadcastMessage, ClientError> {
    let content = value
        .get("original")
        .and_then(|original| original.get("content"))
        .and_then(Value::as_str)
        .ok_or_else(|| ClientError::InvalidServerResponse("missing original.content".to_string()))?;
    let html = value
        .get("html")
        .and_then(Value::as_str)
        .ok_or_else(|| ClientError::InvalidServerResponse("missing html".to_string()))?;
    Ok(BroadcastMessage::new(content, html))
}
