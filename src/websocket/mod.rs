pub mod handler;
pub mod msg_ping_handler;
pub mod msg_update_handler;

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::SinkExt;
use tokio::sync::Mutex;
use tracing::error;

use crate::models::SendMessage;

pub use handler::websocket_handler;

/// Write half of a socket, shared between the reader and broadcast tasks
pub type WsSender = Arc<Mutex<SplitSink<WebSocket, Message>>>;

/// Serialize and send one frame to the client
pub async fn send_frame(sender: &WsSender, frame: &SendMessage) -> Result<(), axum::Error> {
    let text = match serde_json::to_string(frame) {
        Ok(text) => text,
        Err(e) => {
            error!("Failed to serialize frame: {}", e);
            return Ok(());
        }
    };
    sender.lock().await.send(Message::Text(text)).await
}
