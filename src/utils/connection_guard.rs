use std::sync::atomic::Ordering;
use std::sync::Arc;

use tracing::info;

use crate::AppState;

/// Holds a socket's user binding and connection slot; both are given back
/// when the socket task ends, however it ends.
pub struct ConnectionGuard {
    state: Arc<AppState>,
    user_id: u64,
    connection_id: String,
}

impl ConnectionGuard {
    pub fn new(state: Arc<AppState>, user_id: u64, connection_id: String) -> Self {
        state.connections.fetch_add(1, Ordering::SeqCst);
        Self { state, user_id, connection_id }
    }

    pub fn user_id(&self) -> u64 {
        self.user_id
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.state.registry.detach(self.user_id);
        self.state.connections.fetch_sub(1, Ordering::SeqCst);
        info!("Connection {} for user {} closed", self.connection_id, self.user_id);
    }
}
