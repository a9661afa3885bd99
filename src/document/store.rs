use tokio::sync::RwLock;
use tracing::debug;

use crate::models::{Document, RenderedView};

struct StoreState {
    document: Document,
    view: Option<RenderedView>,
}

/// Owner of the single shared document and its most recent rendered view.
///
/// Writes go through the update broadcaster only; everything else reads
/// snapshots.
pub struct DocumentStore {
    state: RwLock<StoreState>,
}

impl DocumentStore {
    pub fn new(initial_content: impl Into<String>) -> Self {
        Self {
            state: RwLock::new(StoreState {
                document: Document {
                    content: initial_content.into(),
                    last_editor_id: None,
                    version: 0,
                },
                view: None,
            }),
        }
    }

    /// Current document snapshot
    pub async fn get_current(&self) -> Document {
        self.state.read().await.document.clone()
    }

    /// Replace the content unconditionally and bump the version
    pub async fn apply_update(&self, content: String, editor_id: u64) -> Document {
        let mut state = self.state.write().await;
        state.document.content = content;
        state.document.last_editor_id = Some(editor_id);
        state.document.version += 1;
        state.document.clone()
    }

    /// Burn a version number without touching the content
    pub async fn consume_version(&self) -> Document {
        let mut state = self.state.write().await;
        state.document.version += 1;
        state.document.clone()
    }

    /// Cache a rendered view. Views for anything but the current version are dropped.
    pub async fn publish_view(&self, view: RenderedView) {
        let mut state = self.state.write().await;
        if view.source_version == state.document.version {
            state.view = Some(view);
        } else {
            debug!(
                "Dropping view for version {} (document is at {})",
                view.source_version, state.document.version
            );
        }
    }

    /// Document together with the cached view, if that view is still current
    pub async fn snapshot(&self) -> (Document, Option<RenderedView>) {
        let state = self.state.read().await;
        let view = state
            .view
            .as_ref()
            .filter(|view| view.source_version == state.document.version)
            .cloned();
        (state.document.clone(), view)
    }
}
