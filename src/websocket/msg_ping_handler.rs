use chrono::Utc;
use tracing::{debug, error};

use super::{send_frame, WsSender};
use crate::models::{PongMessage, SendMessage};

/// Handle a ping frame - reply with a pong
pub async fn handle_ping_message(connection_id: &str, sender: &WsSender) {
    debug!("Ping received on connection {}", connection_id);

    let pong = SendMessage::Pong(PongMessage { date: Utc::now().to_rfc3339() });
    if send_frame(sender, &pong).await.is_err() {
        error!("Failed to send pong on connection {}", connection_id);
    }
}
