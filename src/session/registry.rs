use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::Utc;
use moka::sync::Cache;
use moka::Expiry;
use thiserror::Error;
use tracing::{debug, info};

use crate::models::User;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("user id space exhausted")]
    Exhausted,
}

#[derive(Clone, Debug)]
struct Session {
    user: User,
    // Live sockets bound to this id. Zero means issued but unclaimed.
    connections: u32,
}

/// Unclaimed ids idle out, ids held by a socket never do.
struct SessionExpiry {
    idle: Duration,
}

impl SessionExpiry {
    fn ttl(&self, session: &Session) -> Option<Duration> {
        if session.connections > 0 {
            None
        } else {
            Some(self.idle)
        }
    }
}

impl Expiry<u64, Session> for SessionExpiry {
    fn expire_after_create(&self, _id: &u64, session: &Session, _created_at: Instant) -> Option<Duration> {
        self.ttl(session)
    }

    fn expire_after_update(
        &self,
        _id: &u64,
        session: &Session,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        self.ttl(session)
    }
}

/// Issues user ids and tracks which of them are active.
///
/// Ids are handed out from a monotonic counter starting at 1 and are never
/// issued twice within the lifetime of the registry.
pub struct SessionRegistry {
    next_id: AtomicU64,
    sessions: Cache<u64, Session>,
    // Serializes the read-modify-write of connection counts.
    attach_lock: Mutex<()>,
}

impl SessionRegistry {
    pub fn new(idle: Duration) -> Self {
        Self::starting_at(1, idle)
    }

    fn starting_at(first_id: u64, idle: Duration) -> Self {
        Self {
            next_id: AtomicU64::new(first_id),
            sessions: Cache::builder()
                .max_capacity(1_000_000)
                .expire_after(SessionExpiry { idle })
                .build(),
            attach_lock: Mutex::new(()),
        }
    }

    fn allocate(&self) -> Result<u64, RegistryError> {
        self.next_id
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |id| id.checked_add(1))
            .map_err(|_| RegistryError::Exhausted)
    }

    fn was_issued(&self, id: u64) -> bool {
        id != 0 && id < self.next_id.load(Ordering::SeqCst)
    }

    /// Allocate a fresh id and register it as active
    pub fn generate_user_id(&self) -> Result<u64, RegistryError> {
        let id = self.allocate()?;
        self.sessions.insert(
            id,
            Session {
                user: User { id, connected_at: Utc::now() },
                connections: 0,
            },
        );
        info!("Issued user id {}", id);
        Ok(id)
    }

    /// Bind a socket to a previously issued id, or to a fresh one when the
    /// client did not present an id this registry handed out.
    pub fn attach(&self, requested: Option<u64>) -> Result<User, RegistryError> {
        let _guard = self.attach_lock.lock().unwrap_or_else(|e| e.into_inner());

        let id = match requested {
            Some(id) if self.was_issued(id) => id,
            Some(id) => {
                debug!("Ignoring unknown user id {} on connect", id);
                self.allocate()?
            }
            None => self.allocate()?,
        };

        let session = match self.sessions.get(&id) {
            Some(mut session) => {
                session.connections += 1;
                session
            }
            None => Session {
                user: User { id, connected_at: Utc::now() },
                connections: 1,
            },
        };
        let user = session.user.clone();
        self.sessions.insert(id, session);
        Ok(user)
    }

    /// Drop one socket binding; the id goes inactive with its last socket.
    pub fn detach(&self, id: u64) {
        let _guard = self.attach_lock.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(mut session) = self.sessions.get(&id) {
            if session.connections <= 1 {
                self.sessions.invalidate(&id);
                info!("User {} disconnected", id);
            } else {
                session.connections -= 1;
                self.sessions.insert(id, session);
            }
        }
    }

    /// Mark an id inactive. Releasing an unknown or released id is a no-op,
    /// and so is releasing an id a live socket is still bound to: it goes
    /// inactive with that socket's `detach`.
    pub fn release_user_id(&self, id: u64) {
        let _guard = self.attach_lock.lock().unwrap_or_else(|e| e.into_inner());

        match self.sessions.get(&id) {
            Some(session) if session.connections > 0 => {
                debug!("Not releasing user id {}: {} socket(s) still bound", id, session.connections);
            }
            Some(_) => {
                self.sessions.invalidate(&id);
                info!("Released user id {}", id);
            }
            None => {}
        }
    }

    pub fn is_active(&self, id: u64) -> bool {
        self.sessions.contains_key(&id)
    }

    pub fn active_users(&self) -> Vec<User> {
        let mut users: Vec<User> = self
            .sessions
            .iter()
            .map(|(_, session)| session.user)
            .collect();
        users.sort_by_key(|user| user.id);
        users
    }
}
