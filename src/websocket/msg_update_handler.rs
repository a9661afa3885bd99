use tracing::{debug, error, warn};

use super::{send_frame, WsSender};
use crate::models::{PublishFrame, SendMessage, UpdateMessage, UPDATE_DESTINATION};
use crate::services::BroadcasterHandle;

/// Handle a frame published to a destination.
///
/// Only `/app/update` is routed; the update is queued on the broadcaster and
/// the sender hears back through the broadcast like everyone else.
pub async fn handle_publish_message(
    frame: PublishFrame,
    user_id: u64,
    connection_id: &str,
    broadcaster: &BroadcasterHandle,
    sender: &WsSender,
) {
    if frame.destination != UPDATE_DESTINATION {
        warn!("Connection {} published to unknown destination {}", connection_id, frame.destination);
        let reply = SendMessage::error(format!("Unknown destination '{}'", frame.destination));
        let _ = send_frame(sender, &reply).await;
        return;
    }

    let mut update: UpdateMessage = match serde_json::from_value(frame.payload) {
        Ok(update) => update,
        Err(e) => {
            error!("Malformed update on connection {}: {}", connection_id, e);
            let _ = send_frame(sender, &SendMessage::error(format!("Malformed update: {}", e))).await;
            return;
        }
    };

    // The socket's own binding decides who edited
    if update.sender_id != user_id {
        debug!(
            "Connection {} claimed sender {} but is bound to user {}",
            connection_id, update.sender_id, user_id
        );
        update.sender_id = user_id;
    }

    debug!("Update from user {} ({} bytes)", user_id, update.content.len());
    if let Err(e) = broadcaster.submit(update).await {
        error!("Failed to queue update from user {}: {}", user_id, e);
    }
}
