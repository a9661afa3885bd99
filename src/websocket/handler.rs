use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::{
    broadcast::{self, error::RecvError},
    Mutex,
};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::msg_ping_handler::handle_ping_message;
use super::msg_update_handler::handle_publish_message;
use super::{send_frame, WsSender};
use crate::models::{ConnectedMessage, ReceivedMessage, SendMessage};
use crate::services::PublishedUpdate;
use crate::utils::ConnectionGuard;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectParams {
    pub user_id: Option<u64>,
}

/// Why a socket stopped receiving broadcasts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardEnd {
    /// Writing to the client failed
    SocketClosed,
    /// The client fell behind the fan-out buffer and missed this many updates
    Lagged(u64),
    /// The broadcaster stopped
    Shutdown,
}

/// Deliver broadcasts to one client until it goes away or falls behind.
///
/// A client that lags is told so with an error frame and not fed any further:
/// it has to reconnect and fetch the current document to get back in step.
pub async fn forward_broadcasts<F, Fut>(rbc: &mut broadcast::Receiver<PublishedUpdate>, mut deliver: F) -> ForwardEnd
where
    F: FnMut(SendMessage) -> Fut,
    Fut: Future<Output = Result<(), axum::Error>>,
{
    loop {
        match rbc.recv().await {
            Ok(published) => {
                if deliver(SendMessage::broadcast(published.message)).await.is_err() {
                    return ForwardEnd::SocketClosed;
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                let notice = SendMessage::error(format!("Missed {} update(s); reconnect to resync", skipped));
                let _ = deliver(notice).await;
                return ForwardEnd::Lagged(skipped);
            }
            Err(RecvError::Closed) => return ForwardEnd::Shutdown,
        }
    }
}

/// WebSocket handler
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<ConnectParams>,
    State(app_state): State<Arc<AppState>>,
) -> Response {
    info!("New WebSocket connection attempt (user {:?})", params.user_id);
    ws.on_upgrade(move |socket| handle_socket(socket, params.user_id, app_state))
}

/// Handle WebSocket connection
async fn handle_socket(socket: WebSocket, requested_user: Option<u64>, app_state: Arc<AppState>) {
    // Generate unique connection ID to identify this client in logs
    let connection_id = Uuid::new_v4().to_string();

    let user = match app_state.registry.attach(requested_user) {
        Ok(user) => user,
        Err(e) => {
            error!("Refusing connection {}: {}", connection_id, e);
            return;
        }
    };
    let guard = ConnectionGuard::new(app_state.clone(), user.id, connection_id.clone());
    info!("WebSocket connection {} established for user {}", connection_id, user.id);

    let (sender, mut receiver) = socket.split();
    let sender: WsSender = Arc::new(Mutex::new(sender));

    // Subscribe before announcing, so nothing published after `connected` is missed
    let mut rbc = app_state.broadcaster.subscribe();
    let hello = SendMessage::Connected(ConnectedMessage { user_id: user.id });
    if send_frame(&sender, &hello).await.is_err() {
        warn!("Connection {} closed before handshake", connection_id);
        return;
    }

    // Listen to the socket for incoming frames
    let recv_sender = sender.clone();
    let recv_connection = connection_id.clone();
    let recv_state = app_state.clone();
    let user_id = guard.user_id();
    let mut recv_task = tokio::spawn(async move {
        while let Some(frame) = receiver.next().await {
            let text = match frame {
                Ok(Message::Text(text)) => text,
                Ok(Message::Close(_)) => break,
                Ok(_) => continue,
                Err(e) => {
                    warn!("Socket error on connection {}: {}", recv_connection, e);
                    break;
                }
            };

            let msg: ReceivedMessage = match serde_json::from_str(&text) {
                Ok(msg) => msg,
                Err(e) => {
                    error!("Failed to parse frame on connection {}: {}", recv_connection, e);
                    let _ = send_frame(&recv_sender, &SendMessage::error(format!("Malformed frame: {}", e))).await;
                    continue;
                }
            };

            match msg {
                ReceivedMessage::Send(frame) => {
                    handle_publish_message(frame, user_id, &recv_connection, &recv_state.broadcaster, &recv_sender)
                        .await;
                }
                ReceivedMessage::Ping => handle_ping_message(&recv_connection, &recv_sender).await,
            }
        }
    });

    // Forward every broadcast to this client, in order, echo included
    let send_connection = connection_id.clone();
    let mut send_task = tokio::spawn(async move {
        let end = forward_broadcasts(&mut rbc, |frame| {
            let sender = sender.clone();
            async move { send_frame(&sender, &frame).await }
        })
        .await;

        if let ForwardEnd::Lagged(skipped) = end {
            warn!("Connection {} lagged, skipped {} broadcast(s); closing", send_connection, skipped);
            let close = Message::Close(Some(CloseFrame {
                code: close_code::AGAIN,
                reason: Cow::from("fell behind the update stream"),
            }));
            let _ = sender.lock().await.send(close).await;
        }
    });

    // Wait for either task to finish (and finish the other)
    tokio::select! {
        _ = (&mut recv_task) => send_task.abort(),
        _ = (&mut send_task) => recv_task.abort(),
    };
    drop(guard);
}
