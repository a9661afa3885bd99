//! Client side of the sync protocol.
//!
//! [`ClientSyncAgent`] keeps a local copy of the document, pushes the full
//! text on every edit and lets every broadcast overwrite it.

pub mod agent;
pub mod api;
pub mod connection;

use thiserror::Error;

pub use agent::{ClientSyncAgent, LocalView};
pub use api::ApiClient;
pub use connection::SyncConnection;

#[derive(Error, Debug)]
pub enum ClientError {
    /// No live transport; the update is dropped
    #[error("no live connection to the server")]
    ConnectionUnavailable,
    /// The server answered with something we cannot use
    #[error("invalid server response: {0}")]
    InvalidServerResponse(String),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}
