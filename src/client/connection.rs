use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use super::ClientError;
use crate::models::{BroadcastMessage, ReceivedMessage, SendMessage, UpdateMessage, BROADCAST_DESTINATION};

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// A live pub/sub connection to the server
pub struct SyncConnection {
    user_id: u64,
    outbound: mpsc::UnboundedSender<UpdateMessage>,
    inbound: mpsc::UnboundedReceiver<BroadcastMessage>,
}

impl SyncConnection {
    pub(crate) fn from_channels(
        user_id: u64,
        outbound: mpsc::UnboundedSender<UpdateMessage>,
        inbound: mpsc::UnboundedReceiver<BroadcastMessage>,
    ) -> Self {
        Self { user_id, outbound, inbound }
    }

    /// Open a socket and wait for the server's `connected` frame. Once this
    /// returns, no later broadcast is missed.
    pub async fn connect(url: &str) -> Result<Self, ClientError> {
        debug!("Connecting to {}", url);
        let (ws_stream, _response) = connect_async(url).await?;
        let (mut write, mut read) = ws_stream.split();

        let handshake = async {
            while let Some(frame) = read.next().await {
                match frame? {
                    Message::Text(text) => match serde_json::from_str::<SendMessage>(text.as_str()) {
                        Ok(SendMessage::Connected(connected)) => return Ok(connected.user_id),
                        Ok(_) => continue,
                        Err(e) => return Err(ClientError::InvalidServerResponse(e.to_string())),
                    },
                    Message::Close(_) => break,
                    _ => continue,
                }
            }
            Err::<u64, ClientError>(ClientError::ConnectionUnavailable)
        };
        let user_id = tokio::time::timeout(HANDSHAKE_TIMEOUT, handshake)
            .await
            .map_err(|_| ClientError::ConnectionUnavailable)??;
        info!("Connected to {} as user {}", url, user_id);

        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<UpdateMessage>();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<BroadcastMessage>();
        let (closed_tx, mut closed_rx) = oneshot::channel::<()>();

        // Writer: ends when the agent drops its sender or the reader goes away
        tokio::spawn(async move {
            loop {
                let update = tokio::select! {
                    update = outbound_rx.recv() => match update {
                        Some(update) => update,
                        None => break,
                    },
                    _ = &mut closed_rx => break,
                };
                let text = match ReceivedMessage::update(&update).and_then(|frame| serde_json::to_string(&frame)) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!("Failed to encode update: {}", e);
                        continue;
                    }
                };
                if write.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            write.close().await.ok();
        });

        // Reader: forwards broadcasts, holds `closed_tx` until the socket ends
        tokio::spawn(async move {
            let _closed_tx = closed_tx;
            while let Some(frame) = read.next().await {
                let text = match frame {
                    Ok(Message::Text(text)) => text,
                    Ok(Message::Close(_)) => break,
                    Ok(_) => continue,
                    Err(e) => {
                        warn!("Sync connection error: {}", e);
                        break;
                    }
                };
                match serde_json::from_str::<SendMessage>(text.as_str()) {
                    Ok(SendMessage::Message(topic)) if topic.destination == BROADCAST_DESTINATION => {
                        if inbound_tx.send(topic.payload).is_err() {
                            break;
                        }
                    }
                    Ok(SendMessage::Error(e)) => warn!("Server reported: {}", e.error),
                    Ok(other) => debug!("Ignoring frame {:?}", other),
                    Err(e) => warn!("Failed to decode frame: {}", e),
                }
            }
            debug!("Sync connection closed");
        });

        Ok(Self::from_channels(user_id, outbound_tx, inbound_rx))
    }

    /// User id the server bound this socket to
    pub fn user_id(&self) -> u64 {
        self.user_id
    }

    pub fn is_open(&self) -> bool {
        !self.outbound.is_closed()
    }

    /// Queue an update for sending
    pub fn send(&self, update: UpdateMessage) -> Result<(), ClientError> {
        self.outbound.send(update).map_err(|_| ClientError::ConnectionUnavailable)
    }

    /// Next broadcast, or `None` once the connection is gone
    pub async fn recv(&mut self) -> Option<BroadcastMessage> {
        self.inbound.recv().await
    }
}
