pub mod client;
pub mod config;
pub mod docs;
pub mod document;
pub mod handlers;
pub mod models;
pub mod render;
pub mod routes;
pub mod services;
pub mod session;
pub mod utils;
pub mod websocket;

use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use tokio::task::JoinHandle;

use config::Config;
use document::DocumentStore;
use render::{MarkdownRenderer, Renderer};
use services::{BroadcasterHandle, BroadcasterSettings};
use session::SessionRegistry;

/// Shared server state handed to every handler and socket task
pub struct AppState {
    pub config: Config,
    pub registry: SessionRegistry,
    pub store: Arc<DocumentStore>,
    pub renderer: Arc<dyn Renderer>,
    pub broadcaster: BroadcasterHandle,
    /// Open WebSocket connections
    pub connections: AtomicUsize,
}

impl AppState {
    /// Build the state and start the update broadcaster. Must run inside a
    /// Tokio runtime.
    pub fn new(config: Config) -> (Arc<Self>, JoinHandle<()>) {
        let store = Arc::new(DocumentStore::new(config.initial_text.clone()));
        let renderer: Arc<dyn Renderer> = Arc::new(MarkdownRenderer);
        let (broadcaster, task) =
            BroadcasterHandle::spawn(store.clone(), renderer.clone(), BroadcasterSettings::from(&config));

        let state = Arc::new(Self {
            registry: SessionRegistry::new(config.session_idle()),
            config,
            store,
            renderer,
            broadcaster,
            connections: AtomicUsize::new(0),
        });
        (state, task)
    }
}
