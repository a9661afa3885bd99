use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::document::DocumentStore;
use crate::models::{BroadcastMessage, RenderedView, UpdateMessage};
use crate::render::{RenderError, Renderer};

#[derive(Error, Debug)]
pub enum BroadcastError {
    #[error("update broadcaster is not running")]
    Closed,
    #[error("update of {len} characters exceeds the {max} character limit")]
    ContentTooLarge { len: usize, max: usize },
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// An accepted update as it leaves the broadcaster
#[derive(Debug, Clone)]
pub struct PublishedUpdate {
    pub version: u64,
    pub sender_id: u64,
    pub message: BroadcastMessage,
}

#[derive(Debug, Clone)]
pub struct BroadcasterSettings {
    pub max_content_length: Option<usize>,
    pub queue_capacity: usize,
    pub broadcast_capacity: usize,
}

impl Default for BroadcasterSettings {
    fn default() -> Self {
        Self {
            max_content_length: None,
            queue_capacity: 1024,
            broadcast_capacity: 256,
        }
    }
}

impl From<&Config> for BroadcasterSettings {
    fn from(config: &Config) -> Self {
        Self {
            max_content_length: config.max_content_length,
            queue_capacity: config.update_queue_capacity.max(1),
            broadcast_capacity: config.broadcast_capacity.max(1),
        }
    }
}

/// Apply, render and fan out one update at a time.
///
/// Taking `&mut self` keeps whoever owns the pipeline the only writer, which is
/// what makes versions and broadcast order linear.
pub struct UpdatePipeline {
    store: Arc<DocumentStore>,
    renderer: Arc<dyn Renderer>,
    fanout: broadcast::Sender<PublishedUpdate>,
    max_content_length: Option<usize>,
}

impl UpdatePipeline {
    pub fn new(
        store: Arc<DocumentStore>,
        renderer: Arc<dyn Renderer>,
        fanout: broadcast::Sender<PublishedUpdate>,
        max_content_length: Option<usize>,
    ) -> Self {
        Self { store, renderer, fanout, max_content_length }
    }

    pub async fn process(&mut self, update: UpdateMessage) -> Result<PublishedUpdate, BroadcastError> {
        if let Some(max) = self.max_content_length {
            let len = update.content.chars().count();
            if len > max {
                return Err(BroadcastError::ContentTooLarge { len, max });
            }
        }

        // Render the incoming snapshot first so a failure never half-applies.
        // Large documents take a while, so keep it off the async workers.
        let sender_id = update.sender_id;
        let renderer = Arc::clone(&self.renderer);
        let rendered = tokio::task::spawn_blocking(move || {
            renderer.render(&update.content).map(|html| (update.content, html))
        })
        .await
        .unwrap_or_else(|e| Err(RenderError(format!("render task failed: {}", e))));

        let (content, html) = match rendered {
            Ok(rendered) => rendered,
            Err(e) => {
                let document = self.store.consume_version().await;
                error!(
                    "Dropping update from user {}: {} (version {} consumed)",
                    sender_id, e, document.version
                );
                return Err(e.into());
            }
        };

        // Last writer wins
        let document = self.store.apply_update(content, sender_id).await;
        self.store
            .publish_view(RenderedView { html: html.clone(), source_version: document.version })
            .await;

        let published = PublishedUpdate {
            version: document.version,
            sender_id,
            message: BroadcastMessage::new(document.content, html),
        };

        // Fails only when no socket is subscribed
        if self.fanout.send(published.clone()).is_err() {
            debug!("No subscribers for version {}", published.version);
        }

        Ok(published)
    }
}

/// Cheap, cloneable handle to the broadcaster task
#[derive(Clone)]
pub struct BroadcasterHandle {
    ingress: mpsc::Sender<UpdateMessage>,
    fanout: broadcast::Sender<PublishedUpdate>,
}

impl BroadcasterHandle {
    /// Start the broadcaster task. It runs until every handle is dropped.
    pub fn spawn(
        store: Arc<DocumentStore>,
        renderer: Arc<dyn Renderer>,
        settings: BroadcasterSettings,
    ) -> (Self, JoinHandle<()>) {
        let (ingress, mut rx) = mpsc::channel::<UpdateMessage>(settings.queue_capacity);
        let (fanout, _) = broadcast::channel::<PublishedUpdate>(settings.broadcast_capacity);

        let mut pipeline = UpdatePipeline::new(store, renderer, fanout.clone(), settings.max_content_length);
        let task = tokio::spawn(async move {
            info!("Update broadcaster started");
            while let Some(update) = rx.recv().await {
                match pipeline.process(update).await {
                    Ok(published) => debug!(
                        "Broadcast version {} from user {} to {} subscriber(s)",
                        published.version,
                        published.sender_id,
                        pipeline.fanout.receiver_count()
                    ),
                    Err(e @ BroadcastError::ContentTooLarge { .. }) => warn!("Rejected update: {}", e),
                    // Already logged where the version was consumed
                    Err(BroadcastError::Render(_)) => {}
                    Err(e) => error!("Update failed: {}", e),
                }
            }
            info!("Update broadcaster stopped");
        });

        (Self { ingress, fanout }, task)
    }

    /// Queue an update. Fire-and-forget: the only acknowledgement a client
    /// gets is the broadcast itself.
    pub async fn submit(&self, update: UpdateMessage) -> Result<(), BroadcastError> {
        self.ingress.send(update).await.map_err(|_| BroadcastError::Closed)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PublishedUpdate> {
        self.fanout.subscribe()
    }

    /// False once the broadcaster task has stopped
    pub fn is_running(&self) -> bool {
        !self.ingress.is_closed()
    }

    pub fn subscriber_count(&self) -> usize {
        self.fanout.receiver_count()
    }
}
