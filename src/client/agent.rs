use tracing::{info, warn};

use super::{ApiClient, ClientError, SyncConnection};
use crate::models::{BroadcastMessage, UpdateMessage};

/// What the editor currently shows
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalView {
    pub text: String,
    pub html: String,
}

/// Keeps one editor in step with the shared document.
///
/// Local edits are applied immediately and sent in full, one message per
/// change. Broadcasts overwrite the local view unconditionally, including the
/// echo of this agent's own edits.
pub struct ClientSyncAgent {
    api: ApiClient,
    user_id: Option<u64>,
    view: LocalView,
    connection: Option<SyncConnection>,
}

impl ClientSyncAgent {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            user_id: None,
            view: LocalView::default(),
            connection: None,
        }
    }

    pub fn user_id(&self) -> Option<u64> {
        self.user_id
    }

    pub fn view(&self) -> &LocalView {
        &self.view
    }

    pub fn is_connected(&self) -> bool {
        self.connection.as_ref().is_some_and(SyncConnection::is_open)
    }

    // Requested once, then cached for the agent's lifetime.
    async fn ensure_user_id(&mut self) -> Result<u64, ClientError> {
        if let Some(id) = self.user_id {
            return Ok(id);
        }
        let id = self.api.generate_user_id().await?;
        self.user_id = Some(id);
        Ok(id)
    }

    /// Get a user id, open the connection and load the current document.
    ///
    /// A failed connection leaves the agent usable offline; a malformed
    /// initial-text reply is ignored.
    pub async fn mount(&mut self) -> Result<(), ClientError> {
        let user_id = self.ensure_user_id().await?;

        if let Err(e) = self.connect().await {
            warn!("User {} working offline: {}", user_id, e);
        }

        match self.api.get_initial_text(user_id).await {
            Ok(initial) => self.apply_broadcast(initial),
            Err(ClientError::InvalidServerResponse(reason)) => {
                warn!("Ignoring initial text for user {}: {}", user_id, reason);
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }

    /// (Re)open the socket
    pub async fn connect(&mut self) -> Result<(), ClientError> {
        let user_id = self.ensure_user_id().await?;
        let connection = SyncConnection::connect(&self.api.websocket_url(user_id)).await?;
        if connection.user_id() != user_id {
            warn!("Server bound socket to user {} instead of {}", connection.user_id(), user_id);
        }
        self.connection = Some(connection);
        Ok(())
    }

    pub fn disconnect(&mut self) {
        if self.connection.take().is_some() {
            info!("User {:?} disconnected", self.user_id);
        }
    }

    #[cfg(test)]
    pub(crate) fn with_connection(mut self, user_id: u64, connection: SyncConnection) -> Self {
        self.user_id = Some(user_id);
        self.connection = Some(connection);
        self
    }

    /// Local edit: show it right away and send the full text.
    /// Without a connection the update is dropped and logged.
    pub fn on_local_change(&mut self, text: impl Into<String>) {
        self.view.text = text.into();
        if let Err(e) = self.send_update() {
            warn!("Update from user {:?} not sent: {}", self.user_id, e);
        }
    }

    fn send_update(&self) -> Result<(), ClientError> {
        let (Some(user_id), Some(connection)) = (self.user_id, self.connection.as_ref()) else {
            return Err(ClientError::ConnectionUnavailable);
        };
        connection.send(UpdateMessage {
            content: self.view.text.clone(),
            sender_id: user_id,
        })
    }

    /// Overwrite the local view with server state
    pub fn apply_broadcast(&mut self, message: BroadcastMessage) {
        self.view.text = message.original.content;
        self.view.html = message.html;
    }

    /// Wait for the next broadcast and apply it. `None` when not connected.
    pub async fn next_broadcast(&mut self) -> Option<&LocalView> {
        let message = self.connection.as_mut()?.recv().await?;
        self.apply_broadcast(message);
        Some(&self.view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tokio::sync::mpsc;

    fn offline_agent() -> ClientSyncAgent {
        ClientSyncAgent::new(ApiClient::new("http://127.0.0.1:9"))
    }

    #[test]
    fn edits_apply_locally_without_connection() {
        let mut agent = offline_agent();
        agent.on_local_change("draft");
        assert_eq!(agent.view().text, "draft");
        assert!(!agent.is_connected());
        assert!(matches!(agent.send_update(), Err(ClientError::ConnectionUnavailable)));
    }

    #[test]
    fn every_change_sends_full_text() {
        let (out_tx, mut out_rx) = mpsc::unbounded_channel();
        let (_in_tx, in_rx) = mpsc::unbounded_channel();
        let mut agent = offline_agent().with_connection(7, SyncConnection::from_channels(7, out_tx, in_rx));

        agent.on_local_change("h");
        agent.on_local_change("he");

        assert_eq!(out_rx.try_recv().unwrap(), UpdateMessage { content: "h".into(), sender_id: 7 });
        assert_eq!(out_rx.try_recv().unwrap(), UpdateMessage { content: "he".into(), sender_id: 7 });
        assert!(out_rx.try_recv().is_err());
    }

    #[test]
    fn closed_transport_is_not_fatal() {
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (_in_tx, in_rx) = mpsc::unbounded_channel();
        let mut agent = offline_agent().with_connection(2, SyncConnection::from_channels(2, out_tx, in_rx));
        drop(out_rx);

        agent.on_local_change("lost");
        assert_eq!(agent.view().text, "lost");
        assert!(!agent.is_connected());
    }

    #[tokio::test]
    async fn broadcasts_overwrite_local_edits() {
        let (out_tx, _out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let mut agent = offline_agent().with_connection(1, SyncConnection::from_channels(1, out_tx, in_rx));

        agent.on_local_change("mine, mid-edit");
        in_tx.send(BroadcastMessage::new("theirs", "theirs")).unwrap();

        let view = agent.next_broadcast().await.unwrap().clone();
        assert_eq!(view, LocalView { text: "theirs".into(), html: "theirs".into() });

        drop(in_tx);
        assert!(agent.next_broadcast().await.is_none());
    }

    #[tokio::test]
    async fn next_broadcast_without_connection() {
        let mut agent = offline_agent();
        assert!(agent.next_broadcast().await.is_none());
    }
}
